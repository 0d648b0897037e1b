//! Consoles command handler: print the registry.

use anyhow::Result;

use crate::app::context::AppContext;

pub fn run_consoles_command(ctx: &AppContext) -> Result<()> {
    if ctx.registry.is_empty() {
        println!("No collections configured.");
        return Ok(());
    }
    for category in ctx.registry.categories() {
        println!("{category}");
        for (key, source) in ctx.registry.collections(category) {
            println!(
                "  {key:<12} {:<40} -> {}/",
                source.name_or(key),
                source.folder_or(key)
            );
        }
    }
    Ok(())
}
