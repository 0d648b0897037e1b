//! Integration tests for the single-item transfer.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use romifleur_core::config::Settings;
use romifleur_core::download::temp_path_for;
use romifleur_core::{
    CatalogRegistry, CatalogSource, CatalogTransfer, HttpClient, QueueItem, SettingsStore,
    Transfer,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transfer_for(server: &MockServer, roms: &Path) -> CatalogTransfer {
    let source = CatalogSource {
        name: "Game Boy".to_string(),
        url: format!("{}/files/gb/", server.uri()),
        exts: vec![".zip".to_string(), ".gb".to_string()],
        folder: Some("GameBoy".to_string()),
    };
    let registry = Arc::new(CatalogRegistry::from_sources([(
        "Nintendo".to_string(),
        "GB".to_string(),
        source,
    )]));
    let settings = Arc::new(SettingsStore::in_memory(Settings {
        roms_path: roms.to_path_buf(),
        ra_api_key: String::new(),
    }));
    CatalogTransfer::new(registry, HttpClient::new(), settings)
}

fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, content) in files {
        writer
            .start_file(*name, zip::write::FileOptions::default())
            .expect("start zip entry");
        writer.write_all(content).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

type Reports = Arc<Mutex<Vec<(f64, String)>>>;

fn recorder() -> (Reports, impl Fn(f64, &str) + Send + Sync) {
    let reports: Reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let callback = move |fraction: f64, label: &str| {
        sink.lock().expect("reports lock").push((fraction, label.to_string()));
    };
    (reports, callback)
}

#[tokio::test]
async fn test_transfer_downloads_into_collection_folder() {
    let server = MockServer::start().await;
    let content = b"GB ROM bytes".to_vec();
    Mock::given(method("GET"))
        .and(path("/files/gb/Tetris.gb"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .expect(1)
        .mount(&server)
        .await;
    let roms = TempDir::new().expect("temp dir");
    let transfer = transfer_for(&server, roms.path());
    let (reports, callback) = recorder();

    let ok = transfer
        .transfer(&QueueItem::new("Nintendo", "GB", "Tetris.gb"), Some(&callback))
        .await;

    assert!(ok);
    let dest = roms.path().join("GameBoy").join("Tetris.gb");
    assert_eq!(std::fs::read(&dest).expect("downloaded file"), content);
    assert!(!temp_path_for(&dest).exists());
    let reports = reports.lock().expect("reports lock");
    assert_eq!(reports.last().map(|(f, l)| (*f, l.as_str())), Some((1.0, "Done")));
}

#[tokio::test]
async fn test_existing_file_short_circuits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
        .expect(0)
        .mount(&server)
        .await;
    let roms = TempDir::new().expect("temp dir");
    let folder = roms.path().join("GameBoy");
    std::fs::create_dir_all(&folder).expect("create folder");
    std::fs::write(folder.join("Tetris.gb"), b"old").expect("seed file");
    let transfer = transfer_for(&server, roms.path());
    let (reports, callback) = recorder();

    let ok = transfer
        .transfer(&QueueItem::new("Nintendo", "GB", "Tetris.gb"), Some(&callback))
        .await;

    assert!(ok);
    assert_eq!(std::fs::read(folder.join("Tetris.gb")).expect("file"), b"old");
    let reports = reports.lock().expect("reports lock");
    assert_eq!(reports.last().map(|(f, l)| (*f, l.as_str())), Some((1.0, "Exists")));
}

#[tokio::test]
async fn test_http_error_leaves_no_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/gb/Missing.gb"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let roms = TempDir::new().expect("temp dir");
    let transfer = transfer_for(&server, roms.path());
    let (reports, callback) = recorder();

    let ok = transfer
        .transfer(&QueueItem::new("Nintendo", "GB", "Missing.gb"), Some(&callback))
        .await;

    assert!(!ok);
    let dest = roms.path().join("GameBoy").join("Missing.gb");
    assert!(!dest.exists());
    assert!(!temp_path_for(&dest).exists());
    let reports = reports.lock().expect("reports lock");
    let (fraction, label) = reports.last().cloned().expect("an error report");
    assert!(fraction.abs() < f64::EPSILON);
    assert!(label.starts_with("Error: "), "unexpected label {label}");
}

#[tokio::test]
async fn test_unknown_collection_fails_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let roms = TempDir::new().expect("temp dir");
    let transfer = transfer_for(&server, roms.path());

    let ok = transfer
        .transfer(&QueueItem::new("Sega", "GG", "Sonic.gg"), None)
        .await;

    assert!(!ok);
}

#[tokio::test]
async fn test_zip_is_extracted_and_removed() {
    let server = MockServer::start().await;
    let archive = zip_bytes(&[("Tetris.gb", b"rom".as_slice()), ("README.txt", b"hi".as_slice())]);
    Mock::given(method("GET"))
        .and(path("/files/gb/Tetris.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .mount(&server)
        .await;
    let roms = TempDir::new().expect("temp dir");
    let transfer = transfer_for(&server, roms.path());

    let ok = transfer
        .transfer(&QueueItem::new("Nintendo", "GB", "Tetris.zip"), None)
        .await;

    assert!(ok);
    let folder = roms.path().join("GameBoy");
    assert_eq!(std::fs::read(folder.join("Tetris.gb")).expect("extracted"), b"rom");
    assert!(folder.join("README.txt").exists());
    assert!(!folder.join("Tetris.zip").exists());
}

#[tokio::test]
async fn test_corrupt_zip_is_kept_and_counts_as_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/gb/Broken.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not a zip".to_vec()))
        .mount(&server)
        .await;
    let roms = TempDir::new().expect("temp dir");
    let transfer = transfer_for(&server, roms.path());

    let ok = transfer
        .transfer(&QueueItem::new("Nintendo", "GB", "Broken.zip"), None)
        .await;

    assert!(ok);
    let archive = roms.path().join("GameBoy").join("Broken.zip");
    assert_eq!(std::fs::read(archive).expect("archive kept"), b"not a zip");
}

#[tokio::test]
async fn test_path_traversal_filename_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
        .expect(0)
        .mount(&server)
        .await;
    let roms = TempDir::new().expect("temp dir");
    let transfer = transfer_for(&server, roms.path());

    let ok = transfer
        .transfer(&QueueItem::new("Nintendo", "GB", "../escape.gb"), None)
        .await;

    assert!(!ok);
    assert!(!roms.path().join("escape.gb").exists());
}

#[tokio::test]
async fn test_missing_download_root_is_created_during_transfer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/gb/Tetris.gb"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"rom".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    let base = TempDir::new().expect("temp dir");
    let roms = base.path().join("not").join("yet").join("there");
    let transfer = transfer_for(&server, &roms);

    let ok = transfer
        .transfer(&QueueItem::new("Nintendo", "GB", "Tetris.gb"), None)
        .await;

    assert!(ok);
    assert_eq!(
        std::fs::read(roms.join("GameBoy").join("Tetris.gb")).expect("downloaded file"),
        b"rom"
    );
}
