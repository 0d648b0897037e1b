//! Integration tests for streaming downloads through `HttpClient`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use romifleur_core::catalog::format_bytes;
use romifleur_core::download::temp_path_for;
use romifleur_core::{DownloadError, HttpClient};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Reports = Arc<Mutex<Vec<(f64, String)>>>;

fn recorder() -> (Reports, impl Fn(f64, &str) + Send + Sync) {
    let reports: Reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let callback = move |fraction: f64, label: &str| {
        sink.lock().expect("reports lock").push((fraction, label.to_string()));
    };
    (reports, callback)
}

/// Serves exactly one connection with a raw HTTP response, then closes it.
async fn serve_raw_once(response: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}/game.zip")
}

#[tokio::test]
async fn test_progress_rises_to_one_with_known_length() {
    let server = MockServer::start().await;
    let body = vec![7u8; 200_000];
    Mock::given(method("GET"))
        .and(path("/big.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;
    let dir = TempDir::new().expect("temp dir");
    let dest = dir.path().join("big.bin");
    let (reports, callback) = recorder();

    let written = HttpClient::new()
        .download_to_path(&format!("{}/big.bin", server.uri()), &dest, Some(&callback))
        .await
        .expect("download");

    assert_eq!(written, 200_000);
    assert_eq!(std::fs::read(&dest).expect("read dest"), body);

    let reports = reports.lock().expect("reports lock");
    assert!(!reports.is_empty());
    for pair in reports.windows(2) {
        assert!(pair[0].0 <= pair[1].0, "fractions went backwards: {pair:?}");
    }
    for (fraction, _) in reports.iter() {
        assert!((0.0..=1.0).contains(fraction));
    }
    let (last_fraction, last_label) = reports.last().expect("at least one report");
    assert!((last_fraction - 1.0).abs() < f64::EPSILON);
    assert_eq!(last_label, &format_bytes(200_000));
}

#[tokio::test]
async fn test_no_progress_without_content_length() {
    let mut response = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
        .to_vec();
    response.extend_from_slice(b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n");
    let url = serve_raw_once(response).await;
    let dir = TempDir::new().expect("temp dir");
    let dest = dir.path().join("game.zip");
    let (reports, callback) = recorder();

    let written = HttpClient::new()
        .download_to_path(&url, &dest, Some(&callback))
        .await
        .expect("download");

    assert_eq!(written, 11);
    assert_eq!(std::fs::read(&dest).expect("read dest"), b"hello world");
    assert!(reports.lock().expect("reports lock").is_empty());
}

#[tokio::test]
async fn test_truncated_body_leaves_nothing_on_disk() {
    let mut response =
        b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n".to_vec();
    response.extend_from_slice(&[1u8; 10]);
    let url = serve_raw_once(response).await;
    let dir = TempDir::new().expect("temp dir");
    let dest = dir.path().join("game.zip");

    let err = HttpClient::new()
        .download_to_path(&url, &dest, None)
        .await
        .expect_err("short body must fail");

    assert!(
        matches!(
            err,
            DownloadError::Network { .. } | DownloadError::Integrity { .. }
        ),
        "unexpected error: {err:?}"
    );
    assert!(!dest.exists());
    assert!(!temp_path_for(&dest).exists());
}

#[tokio::test]
async fn test_error_status_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let dir = TempDir::new().expect("temp dir");
    let dest = dir.path().join("missing.zip");

    let err = HttpClient::new()
        .download_to_path(&format!("{}/missing.zip", server.uri()), &dest, None)
        .await
        .expect_err("404 must fail");

    assert!(matches!(err, DownloadError::HttpStatus { status: 404, .. }));
    assert!(!dest.exists());
    assert!(!temp_path_for(&dest).exists());
}

#[tokio::test]
async fn test_stalled_server_is_reported_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let dir = TempDir::new().expect("temp dir");
    let dest = dir.path().join("slow.zip");

    let err = HttpClient::new_with_timeouts(5, 1)
        .download_to_path(&format!("{}/slow.zip", server.uri()), &dest, None)
        .await
        .expect_err("stalled response must time out");

    assert!(matches!(err, DownloadError::Timeout { .. }), "unexpected error: {err:?}");
    assert!(!dest.exists());
}
