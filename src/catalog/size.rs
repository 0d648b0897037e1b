//! Human-readable size labels.
//!
//! Listings expose sizes as free text ("12.3 MB", "700K", "1.2 GiB"). Labels
//! are carried around opaquely; these helpers convert between labels and byte
//! counts when a number is needed (progress text, totals).

use std::sync::LazyLock;

use regex::Regex;

/// Sentinel label used when a listing does not expose a size.
pub const UNKNOWN_SIZE: &str = "N/A";

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

#[allow(clippy::expect_used)]
static SIZE_LABEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*([kmgt]?)i?b?\s*$").expect("size label regex is valid") // Static pattern, safe to panic
});

/// Parses a size label into a byte count (binary multiples).
///
/// Returns `None` for [`UNKNOWN_SIZE`] or any label that does not look like a
/// size.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn parse_size_label(label: &str) -> Option<u64> {
    let captures = SIZE_LABEL_PATTERN.captures(label)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    let exponent = match captures.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(unit) if unit == "k" => 1,
        Some(unit) if unit == "m" => 2,
        Some(unit) if unit == "g" => 3,
        Some(unit) if unit == "t" => 4,
        _ => 0,
    };
    let bytes = value * 1024f64.powi(exponent);
    Some(bytes.round() as u64)
}

/// Formats a byte count with two decimals in the largest fitting unit.
///
/// Values under 1 KB are printed as whole bytes.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_megabytes_with_space() {
        assert_eq!(parse_size_label("1.5 MB"), Some(1_572_864));
    }

    #[test]
    fn test_parse_compact_apache_style() {
        assert_eq!(parse_size_label("700K"), Some(716_800));
        assert_eq!(parse_size_label("2G"), Some(2 * 1024 * 1024 * 1024));
    }

    #[test]
    fn test_parse_binary_suffix_and_case() {
        assert_eq!(parse_size_label("1 kib"), Some(1024));
        assert_eq!(parse_size_label("  3 mB "), Some(3 * 1024 * 1024));
    }

    #[test]
    fn test_parse_plain_bytes() {
        assert_eq!(parse_size_label("512 B"), Some(512));
        assert_eq!(parse_size_label("512"), Some(512));
    }

    #[test]
    fn test_parse_rejects_sentinel_and_garbage() {
        assert_eq!(parse_size_label(UNKNOWN_SIZE), None);
        assert_eq!(parse_size_label(""), None);
        assert_eq!(parse_size_label("-"), None);
        assert_eq!(parse_size_label("2024-01-01"), None);
    }

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1_572_864), "1.50 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_label_round_trip_agrees_within_rounding() {
        let bytes = parse_size_label("1.5 MB").unwrap();
        assert_eq!(format_bytes(bytes), "1.50 MB");

        let bytes = parse_size_label("12.3 MB").unwrap();
        assert_eq!(format_bytes(bytes), "12.30 MB");
    }
}
