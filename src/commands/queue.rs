//! Queue command handlers: edit the saved queue.

use anyhow::{Context, Result, bail};
use romifleur_core::QueueItem;

use crate::app::context::AppContext;
use crate::cli::QueueCommand;

pub fn run_queue_command(ctx: &AppContext, command: QueueCommand) -> Result<()> {
    let queue = ctx.load_queue()?;

    match command {
        QueueCommand::Add {
            category,
            collection,
            filename,
            size,
        } => {
            if ctx.registry.get(&category, &collection).is_none() {
                bail!("unknown collection {category}/{collection}");
            }
            let mut item = QueueItem::new(category, collection, filename);
            if let Some(size) = size {
                item = item.with_size(size);
            }
            let label = item.to_string();
            if queue.add(item) {
                ctx.save_queue(&queue)?;
                println!("Added {label}");
            } else {
                println!("Already queued: {label}");
            }
        }
        QueueCommand::List => {
            let items = queue.items();
            if items.is_empty() {
                println!("Queue is empty.");
            }
            for (position, item) in items.iter().enumerate() {
                println!("{:>3}. {item}", position + 1);
            }
        }
        QueueCommand::Remove { position } => {
            let index = usize::try_from(position)?.saturating_sub(1);
            let Some(removed) = queue.remove(index) else {
                bail!("no queued file at position {position} (queue has {})", queue.len());
            };
            ctx.save_queue(&queue)?;
            println!("Removed {removed}");
        }
        QueueCommand::Clear => {
            let count = queue.clear();
            ctx.save_queue(&queue)?;
            println!("Removed {count} file(s).");
        }
        QueueCommand::Export { path } => {
            let document = queue.export()?;
            match path {
                Some(path) => {
                    std::fs::write(&path, document)
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    println!("Exported {} file(s) to {}", queue.len(), path.display());
                }
                None => println!("{document}"),
            }
        }
        QueueCommand::Import { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let report = queue
                .import_json(&raw)
                .with_context(|| format!("cannot import {}", path.display()))?;
            ctx.save_queue(&queue)?;
            println!(
                "Imported {} file(s), {} already queued, {} invalid.",
                report.added, report.duplicates, report.invalid
            );
        }
    }

    Ok(())
}
