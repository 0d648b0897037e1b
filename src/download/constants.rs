//! Constants for the download module (timeouts, buffering).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle read timeout for transfers (60 seconds between reads).
pub const READ_TIMEOUT_SECS: u64 = 60;

/// Whole-request timeout for directory listing pages.
pub const LISTING_TIMEOUT_SECS: u64 = 30;

/// Whole-request timeout for achievement lookups.
pub const ACHIEVEMENTS_TIMEOUT_SECS: u64 = 10;

/// Suffix of the sibling file a transfer streams into before the final rename.
pub const TEMP_SUFFIX: &str = ".tmp";
