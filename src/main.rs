//! CLI entry point for romifleur.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod app;
mod cli;
mod commands;

use app::context::AppContext;
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    app::terminal::init_tracing(app::terminal::default_log_level(cli.verbose, cli.quiet));
    debug!(?cli, "CLI arguments parsed");

    let ctx = AppContext::build(cli.data_dir.clone(), cli.consoles.as_deref())?;

    match cli.command {
        Command::Consoles => commands::run_consoles_command(&ctx),
        Command::Search(args) => commands::run_search_command(&ctx, &args).await,
        Command::Queue(command) => commands::run_queue_command(&ctx, command),
        Command::Download(args) => commands::run_download_command(&ctx, &args, cli.quiet).await,
        Command::Settings(command) => commands::run_settings_command(&ctx, command).await,
    }
}
