//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use romifleur_core::DEFAULT_CONCURRENCY;

/// Browse remote ROM catalogs, queue files and download them.
///
/// Collections come from a registry of directory listings grouped by
/// category. Searches filter and deduplicate listings; queued files are
/// downloaded concurrently into `<roms path>/<folder>/`.
#[derive(Parser, Debug)]
#[command(name = "romifleur")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output (give it before the subcommand)
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory holding settings, the saved queue and caches
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Collection registry file (defaults to `<data dir>/consoles.json`, then the built-in one)
    #[arg(long, global = true)]
    pub consoles: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List categories and collections of the registry
    Consoles,

    /// Search one collection
    Search(SearchArgs),

    /// Inspect or edit the saved download queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Download every queued file
    Download(DownloadArgs),

    /// Show or change settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

/// Arguments for `search`.
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Category name (e.g. "Nintendo")
    pub category: String,

    /// Collection key within the category (e.g. "SNES")
    pub collection: String,

    /// Case-insensitive substring to match
    #[arg(short = 'q', long = "query", default_value = "")]
    pub query: String,

    /// Region tag to keep (repeatable; defaults to Europe, France, Fr, USA, Japan)
    #[arg(short = 'r', long = "region")]
    pub regions: Vec<String>,

    /// Disable the region filter entirely
    #[arg(long, conflicts_with = "regions")]
    pub any_region: bool,

    /// Keep demos and samples
    #[arg(long)]
    pub include_demos: bool,

    /// Keep betas, prototypes, kiosk and unlicensed dumps
    #[arg(long)]
    pub include_betas: bool,

    /// Keep every variant instead of the best one per title
    #[arg(long)]
    pub all_versions: bool,

    /// Fetch the listing again even if cached
    #[arg(long)]
    pub refresh: bool,

    /// Keep only titles with RetroAchievements support (needs an API key)
    #[arg(long)]
    pub only_achievements: bool,

    /// Queue every result
    #[arg(long)]
    pub add: bool,
}

/// Queue subcommands.
#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// Add a file to the queue
    Add {
        /// Category name
        category: String,
        /// Collection key
        collection: String,
        /// Filename as listed
        filename: String,
        /// Display size label
        #[arg(long)]
        size: Option<String>,
    },

    /// Print queued files
    List,

    /// Remove the file at a 1-based position
    Remove {
        /// Position as shown by `queue list`
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        position: u32,
    },

    /// Remove every queued file
    Clear,

    /// Write the queue as JSON to a file, or stdout when omitted
    Export {
        /// Output file
        path: Option<PathBuf>,
    },

    /// Merge a JSON queue file into the queue
    Import {
        /// Input file
        path: PathBuf,
    },
}

/// Arguments for `download`.
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Maximum concurrent downloads (1-16)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub concurrency: u8,
}

/// Settings subcommands.
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print current settings
    Show,

    /// Change settings
    Set {
        /// Download root
        #[arg(long)]
        roms_path: Option<PathBuf>,
        /// RetroAchievements web API key
        #[arg(long)]
        ra_api_key: Option<String>,
    },

    /// Check the configured (or given) RetroAchievements key
    CheckKey {
        /// Key to check instead of the configured one
        key: Option<String>,
    },
}
