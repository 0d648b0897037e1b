//! Progress bar for download batches.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use romifleur_core::BatchProgress;
use tokio::sync::broadcast::{self, error::RecvError};

/// Spawns the progress bar driven by `updates` when requested.
///
/// The task ends on the final snapshot (`is_downloading == false`) or when
/// the channel closes. Returns `None` when `show_bar` is false.
pub(crate) fn spawn_progress_ui(
    show_bar: bool,
    updates: broadcast::Receiver<BatchProgress>,
    total: usize,
) -> Option<tokio::task::JoinHandle<()>> {
    show_bar.then(|| tokio::spawn(draw_progress(updates, total)))
}

async fn draw_progress(mut updates: broadcast::Receiver<BatchProgress>, total: usize) {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    loop {
        match updates.recv().await {
            Ok(progress) => {
                bar.set_position(progress.current as u64);
                bar.set_message(status_line(&progress));
                if !progress.is_downloading {
                    break;
                }
            }
            Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => break,
        }
    }

    bar.finish_and_clear();
}

fn status_line(progress: &BatchProgress) -> String {
    if progress.current_file.is_empty() {
        progress.status.clone()
    } else {
        format!("{} {}", progress.status, progress.current_file)
    }
}
