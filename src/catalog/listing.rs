//! Directory listing parser.
//!
//! Turns an HTML directory index into [`CatalogEntry`] values. Two layouts are
//! recognised for sizes:
//!
//! - tabular indexes (one `<tr>` per file, size in a later `<td>`);
//! - flat Apache/Nginx indexes (`<a>` followed by a text run ending in "1.2M").
//!
//! The parser is heuristic. Links it cannot size get the [`UNKNOWN_SIZE`] label.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::registry::CatalogSource;
use super::size::UNKNOWN_SIZE;

/// Anchor elements carrying a target.
#[allow(clippy::expect_used)]
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid")); // Static pattern, safe to panic

/// Size-looking text inside a table cell ("1.2 MiB", "700 KB", "12B").
#[allow(clippy::expect_used)]
static TABLE_SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+(\.\d+)?\s*[BKMG]i?B?").expect("table size regex is valid") // Static pattern, safe to panic
});

/// Trailing token of a flat listing line ("1.2M", "512K").
#[allow(clippy::expect_used)]
static FLAT_SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\d.]+[BKMG]$").expect("flat size regex is valid") // Static pattern, safe to panic
});

/// One downloadable object discovered in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Decoded filename, extension included.
    pub name: String,
    /// Human-readable size label or [`UNKNOWN_SIZE`].
    pub size: String,
}

impl CatalogEntry {
    /// Creates an entry.
    pub fn new(name: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: size.into(),
        }
    }

    /// Creates an entry without a known size.
    pub fn without_size(name: impl Into<String>) -> Self {
        Self::new(name, UNKNOWN_SIZE)
    }
}

/// Extracts every accepted link from a listing page, in document order.
#[must_use]
pub fn parse_listing(html: &str, source: &CatalogSource) -> Vec<CatalogEntry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    for link in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !source.accepts(href) {
            continue;
        }

        let name = urlencoding::decode(href).map_or_else(
            |e| {
                debug!(href, error = %e, "percent-decoding failed, using raw href");
                href.to_string()
            },
            |decoded| decoded.into_owned(),
        );
        if name == "." || name == ".." {
            continue;
        }

        let size = extract_size(link);
        trace!(name = %name, size = %size, "listing entry");
        entries.push(CatalogEntry { name, size });
    }

    entries
}

/// Finds a size label near a link, tabular layout first.
fn extract_size(link: ElementRef<'_>) -> String {
    size_from_table(link)
        .or_else(|| size_from_trailing_text(link))
        .unwrap_or_else(|| UNKNOWN_SIZE.to_string())
}

fn size_from_table(link: ElementRef<'_>) -> Option<String> {
    let cell = link
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "td")?;

    cell.next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .map(|td| td.text().collect::<String>().trim().to_string())
        .find(|text| TABLE_SIZE_PATTERN.is_match(text))
}

fn size_from_trailing_text(link: ElementRef<'_>) -> Option<String> {
    let sibling = link.next_sibling()?;
    let text = sibling.value().as_text()?;
    let candidate = text.split_whitespace().next_back()?;
    FLAT_SIZE_PATTERN
        .is_match(candidate)
        .then(|| candidate.to_string())
}
