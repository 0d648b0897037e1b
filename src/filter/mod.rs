//! Search filters over fetched catalog entries.
//!
//! Filtering is pure and order-preserving. Deduplication ([`deduplicate`])
//! is layered on top when requested and re-sorts by name.

mod dedup;

pub(crate) use dedup::strip_extension;
pub use dedup::{canonical_title, deduplicate, score};

use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::CatalogEntry;

/// Region tags applied by the CLI when the user does not pass any.
pub const DEFAULT_REGIONS: &[&str] = &["Europe", "France", "Fr", "USA", "Japan"];

const DEMO_PATTERNS: &[&str] = &["Demo", "Sample"];
const BETA_PATTERNS: &[&str] = &["Beta", "Proto", "Kiosk", "Unl"];

#[allow(clippy::expect_used)]
static TAG_GROUP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([^)]+)\)").expect("tag group regex is valid") // Static pattern, safe to panic
});

/// Options for one search over a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Case-insensitive substring; empty matches everything.
    pub query: String,
    /// Region tags; empty disables the region filter.
    pub regions: Vec<String>,
    /// Drop demos and samples.
    pub exclude_demos: bool,
    /// Drop betas, prototypes, kiosk and unlicensed dumps.
    pub exclude_betas: bool,
    /// Collapse variants of the same title.
    pub deduplicate: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            query: String::new(),
            regions: Vec::new(),
            exclude_demos: true,
            exclude_betas: true,
            deduplicate: true,
        }
    }
}

/// Applies query, exclusion and region filters, then deduplicates if asked.
#[must_use]
pub fn search(entries: &[CatalogEntry], options: &SearchOptions) -> Vec<CatalogEntry> {
    let filtered = filter_entries(entries, options);
    if options.deduplicate {
        deduplicate(&filtered)
    } else {
        filtered
    }
}

/// Applies query, exclusion and region filters, keeping input order.
#[must_use]
pub fn filter_entries(entries: &[CatalogEntry], options: &SearchOptions) -> Vec<CatalogEntry> {
    let query = options.query.to_lowercase();
    let excluded = exclusion_patterns(options.exclude_demos, options.exclude_betas);
    let regions: Vec<String> = options
        .regions
        .iter()
        .map(|r| r.trim().to_lowercase())
        .collect();

    entries
        .iter()
        .filter(|entry| {
            let name = entry.name.to_lowercase();
            (query.is_empty() || name.contains(&query))
                && !excluded
                    .iter()
                    .any(|pattern| name.contains(pattern.as_str()))
                && (regions.is_empty() || matches_region(&entry.name, &regions))
        })
        .cloned()
        .collect()
}

/// Lower-cased exclusion substrings for the given switches.
#[must_use]
pub fn exclusion_patterns(exclude_demos: bool, exclude_betas: bool) -> Vec<String> {
    let mut patterns = Vec::new();
    if exclude_demos {
        patterns.extend(DEMO_PATTERNS.iter().map(|p| p.to_lowercase()));
    }
    if exclude_betas {
        patterns.extend(BETA_PATTERNS.iter().map(|p| p.to_lowercase()));
    }
    patterns
}

/// Every comma-separated token of every parenthesized group, trimmed and lower-cased.
#[must_use]
pub fn tag_set(name: &str) -> Vec<String> {
    TAG_GROUP_PATTERN
        .captures_iter(name)
        .filter_map(|c| c.get(1))
        .flat_map(|group| group.as_str().split(','))
        .map(|tag| tag.trim().to_lowercase())
        .collect()
}

/// `regions` must already be lower-cased.
fn matches_region(name: &str, regions: &[String]) -> bool {
    let tags = tag_set(name);
    regions.iter().any(|region| tags.contains(region))
}
