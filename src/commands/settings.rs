//! Settings command handlers.

use anyhow::{Context, Result, bail};

use crate::app::context::AppContext;
use crate::cli::SettingsCommand;

pub async fn run_settings_command(ctx: &AppContext, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            let settings = ctx.settings.settings();
            let path = ctx.settings.path().map_or_else(
                || "<in memory>".to_string(),
                |path| path.display().to_string(),
            );
            println!("settings_path = {path}");
            println!("data_dir = {}", ctx.data_dir.display());
            println!("roms_path = {}", settings.roms_path.display());
            println!(
                "ra_api_key = {}",
                if settings.ra_api_key.is_empty() {
                    "<not set>"
                } else {
                    "<set>"
                }
            );
        }
        SettingsCommand::Set {
            roms_path,
            ra_api_key,
        } => {
            if roms_path.is_none() && ra_api_key.is_none() {
                bail!("nothing to change; pass --roms-path and/or --ra-api-key");
            }
            ctx.settings
                .update(roms_path, ra_api_key)
                .context("cannot save settings")?;
            println!("Settings saved.");
        }
        SettingsCommand::CheckKey { key } => {
            let key = key.unwrap_or_else(|| ctx.settings.settings().ra_api_key);
            if key.is_empty() {
                bail!("no RetroAchievements key configured");
            }
            if ctx.achievements.validate_key(&key).await {
                println!("RetroAchievements key is valid.");
            } else {
                bail!("RetroAchievements key was rejected");
            }
        }
    }
    Ok(())
}
