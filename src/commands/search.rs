//! Search command handler: filter a collection and optionally queue results.

use anyhow::{Result, bail};
use romifleur_core::filter::{self, DEFAULT_REGIONS};
use romifleur_core::{CatalogEntry, QueueItem, SearchOptions, is_compatible};
use tracing::{info, warn};

use crate::app::context::AppContext;
use crate::cli::SearchArgs;

pub async fn run_search_command(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    if ctx.registry.get(&args.category, &args.collection).is_none() {
        bail!(
            "unknown collection {}/{} (see `romifleur consoles`)",
            args.category,
            args.collection
        );
    }

    let options = search_options(args);
    let entries = ctx
        .fetcher
        .fetch(&args.category, &args.collection, args.refresh)
        .await;
    let mut results = filter::search(&entries, &options);

    if args.only_achievements {
        results = keep_achievement_titles(ctx, &args.collection, results).await;
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for entry in &results {
        println!("{:>10}  {}", entry.size, entry.name);
    }
    println!("{} result(s)", results.len());

    if args.add {
        let queue = ctx.load_queue()?;
        let added = queue.add_batch(results.into_iter().map(|entry| {
            QueueItem::new(&args.category, &args.collection, entry.name).with_size(entry.size)
        }));
        ctx.save_queue(&queue)?;
        info!(added, queued = queue.len(), "queued search results");
        println!("Queued {added} file(s); {} in queue.", queue.len());
    }

    Ok(())
}

fn search_options(args: &SearchArgs) -> SearchOptions {
    let regions = if args.any_region {
        Vec::new()
    } else if args.regions.is_empty() {
        DEFAULT_REGIONS.iter().map(ToString::to_string).collect()
    } else {
        args.regions.clone()
    };
    SearchOptions {
        query: args.query.clone(),
        regions,
        exclude_demos: !args.include_demos,
        exclude_betas: !args.include_betas,
        deduplicate: !args.all_versions,
    }
}

async fn keep_achievement_titles(
    ctx: &AppContext,
    collection: &str,
    results: Vec<CatalogEntry>,
) -> Vec<CatalogEntry> {
    if ctx.settings.settings().ra_api_key.is_empty() {
        warn!("no RetroAchievements key configured; achievements filter skipped");
        return results;
    }
    let games = ctx.achievements.supported_games(collection).await;
    results
        .into_iter()
        .filter(|entry| is_compatible(&entry.name, &games))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    fn parse(argv: &[&str]) -> SearchArgs {
        let mut full = vec!["romifleur", "search", "Nintendo", "SNES"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Search(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_search_options_default_regions() {
        let options = search_options(&parse(&[]));
        assert_eq!(options.regions, DEFAULT_REGIONS);
        assert!(options.exclude_demos);
        assert!(options.exclude_betas);
        assert!(options.deduplicate);
    }

    #[test]
    fn test_search_options_any_region_disables_filter() {
        let options = search_options(&parse(&["--any-region"]));
        assert!(options.regions.is_empty());
    }

    #[test]
    fn test_search_options_flags_invert() {
        let options = search_options(&parse(&[
            "--include-demos",
            "--include-betas",
            "--all-versions",
            "-r",
            "Germany",
        ]));
        assert_eq!(options.regions, vec!["Germany"]);
        assert!(!options.exclude_demos);
        assert!(!options.exclude_betas);
        assert!(!options.deduplicate);
    }
}
