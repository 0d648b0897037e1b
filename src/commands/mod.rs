//! CLI command handlers.

mod consoles;
mod download;
mod queue;
mod search;
mod settings;

pub use consoles::run_consoles_command;
pub use download::run_download_command;
pub use queue::run_queue_command;
pub use search::run_search_command;
pub use settings::run_settings_command;
