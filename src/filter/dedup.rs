//! Title deduplication.
//!
//! Dumps of the same game differ only by tags: `Game (USA)`, `Game (Europe)
//! (Rev 1)`, `Game (France)`. Entries are grouped by canonical title and the
//! best-scoring one is kept. Ties keep the first entry seen, so the result
//! depends on input order; callers pass entries in listing order.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::catalog::CatalogEntry;

#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\([^)]+\)").expect("title tag regex is valid") // Static pattern, safe to panic
});

/// Score bonus for French releases.
const FRENCH_BONUS: i32 = 2;
/// Score bonus for European releases without a French tag.
const EUROPE_BONUS: i32 = 1;
/// Penalty for re-releases that are usually worse dumps.
const VIRTUAL_CONSOLE_PENALTY: i32 = -50;

/// Keeps the best entry per canonical title, sorted by name.
#[must_use]
pub fn deduplicate(entries: &[CatalogEntry]) -> Vec<CatalogEntry> {
    let mut best: Vec<(i32, &CatalogEntry)> = Vec::new();
    let mut index_by_title: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let candidate_score = score(&entry.name);
        match index_by_title.entry(canonical_title(&entry.name)) {
            Entry::Vacant(slot) => {
                slot.insert(best.len());
                best.push((candidate_score, entry));
            }
            Entry::Occupied(slot) => {
                let current = &mut best[*slot.get()];
                if candidate_score > current.0 {
                    *current = (candidate_score, entry);
                }
            }
        }
    }

    let mut kept: Vec<CatalogEntry> = best.into_iter().map(|(_, e)| e.clone()).collect();
    kept.sort_by(|a, b| a.name.cmp(&b.name));
    kept
}

/// Grouping key: name without extension and without tags, except disc tags.
///
/// `Game (Europe) (Disc 1).zip` → `Game (disc 1)`. Disc groups are kept so
/// multi-disc releases stay distinct; they come back lower-cased.
#[must_use]
pub fn canonical_title(name: &str) -> String {
    let stem = strip_extension(name);
    TAG_PATTERN
        .replace_all(stem, |caps: &Captures<'_>| {
            let group = caps[0].to_lowercase();
            if group.contains("disc") || group.contains("disk") {
                group
            } else {
                String::new()
            }
        })
        .trim()
        .to_string()
}

/// Preference score; higher wins.
#[must_use]
pub fn score(name: &str) -> i32 {
    let mut score = 0;
    if name.contains("(France)") || name.contains("(Fr)") {
        score += FRENCH_BONUS;
    } else if name.contains("(Europe)") {
        score += EUROPE_BONUS;
    }
    if name.contains("Virtual Console") {
        score += VIRTUAL_CONSOLE_PENALTY;
    }
    score
}

/// Drops the last `.ext`; leading-dot names keep their dot.
pub(crate) fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) if !name[..index].chars().all(|c| c == '.') => &name[..index],
        _ => name,
    }
}
