//! Shared User-Agent string for every HTTP client in the crate.
//!
//! Listing fetches, transfers and achievement lookups all go through one
//! client, so mirrors see a single consistent identification.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/romifleur";

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("romifleur/{version} (+{PROJECT_UA_URL})")
}
