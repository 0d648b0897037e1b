//! Runtime wiring shared by the command handlers.

pub(crate) mod context;
pub(crate) mod progress_manager;
pub(crate) mod terminal;
