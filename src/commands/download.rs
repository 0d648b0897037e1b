//! Download command handler: run one batch over the saved queue.

use std::sync::Arc;

use anyhow::{Context, Result};
use romifleur_core::{CatalogTransfer, DownloadEngine, StartRejection};
use tracing::info;

use crate::app::context::AppContext;
use crate::app::progress_manager;
use crate::cli::DownloadArgs;

pub async fn run_download_command(
    ctx: &AppContext,
    args: &DownloadArgs,
    quiet: bool,
) -> Result<()> {
    let queue = Arc::new(ctx.load_queue()?);
    let transfer = Arc::new(CatalogTransfer::new(
        Arc::clone(&ctx.registry),
        ctx.client.clone(),
        Arc::clone(&ctx.settings),
    ));
    let engine = DownloadEngine::new(Arc::clone(&queue), transfer, usize::from(args.concurrency))
        .context("invalid download settings")?;

    let updates = engine.subscribe();
    let batch = match engine.start() {
        Ok(batch) => batch,
        Err(StartRejection::EmptyQueue) => {
            println!("Queue is empty; nothing to download.");
            return Ok(());
        }
        Err(rejection) => return Err(rejection).context("cannot start downloads"),
    };

    let destination = ctx.settings.download_root();
    info!(
        total = batch.total(),
        root = %destination.display(),
        "downloading queue"
    );
    let ui = progress_manager::spawn_progress_ui(!quiet, updates, batch.total());

    let stats = batch.wait().await;
    if let Some(ui) = ui {
        let _ = ui.await;
    }

    // The engine empties the queue once the batch ends.
    ctx.save_queue(&queue)?;

    println!(
        "{} downloaded, {} failed, {} total (into {})",
        stats.succeeded(),
        stats.failed(),
        stats.total(),
        destination.display()
    );
    Ok(())
}
