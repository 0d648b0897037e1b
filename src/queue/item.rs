//! Queue item type and its export record format.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::UNKNOWN_SIZE;

fn unknown_size() -> String {
    UNKNOWN_SIZE.to_string()
}

/// One requested download.
///
/// Serializes as the export record `{category, console, filename, size}`;
/// `collection` is also accepted on input. Queue identity is `filename` alone:
/// two collections offering the same filename cannot both be queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Registry category ("Nintendo").
    pub category: String,
    /// Collection key inside the category ("SNES").
    #[serde(rename = "console", alias = "collection")]
    pub collection: String,
    /// Remote object name, also the local file name.
    pub filename: String,
    /// Size label as shown in the listing, or `"N/A"`.
    #[serde(default = "unknown_size", alias = "sizeLabel")]
    pub size: String,
}

impl QueueItem {
    /// Creates an item with an unknown size.
    pub fn new(
        category: impl Into<String>,
        collection: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            collection: collection.into(),
            filename: filename.into(),
            size: unknown_size(),
        }
    }

    /// Sets the size label.
    #[must_use]
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    /// Parses one import record.
    ///
    /// Accepts the object form and the legacy positional arrays
    /// `[category, console, filename]` and `[category, console, filename, size]`.
    /// Returns `None` for anything else, including an empty filename.
    #[must_use]
    pub fn from_record(value: &Value) -> Option<Self> {
        let item = match value {
            Value::Object(_) => serde_json::from_value::<Self>(value.clone()).ok()?,
            Value::Array(fields) if fields.len() >= 3 => {
                let text = |index: usize| fields.get(index).and_then(Value::as_str);
                let item = Self::new(text(0)?, text(1)?, text(2)?);
                match fields.get(3) {
                    Some(Value::String(size)) => item.with_size(size.clone()),
                    Some(Value::Null) | None => item,
                    Some(_) => return None,
                }
            }
            _ => return None,
        };
        (!item.filename.trim().is_empty()).then_some(item)
    }
}

impl fmt::Display for QueueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}/{}] ({})",
            self.filename, self.category, self.collection, self.size
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serializes_as_export_record() {
        let item = QueueItem::new("Nintendo", "SNES", "Zelda (Europe).zip").with_size("1.5 MB");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            json!({
                "category": "Nintendo",
                "console": "SNES",
                "filename": "Zelda (Europe).zip",
                "size": "1.5 MB"
            })
        );
    }

    #[test]
    fn test_record_size_defaults_to_unknown() {
        let item = QueueItem::from_record(&json!({
            "category": "Sega",
            "console": "MegaDrive",
            "filename": "Sonic (Europe).zip"
        }))
        .unwrap();
        assert_eq!(item.size, "N/A");
        assert_eq!(item.collection, "MegaDrive");
    }

    #[test]
    fn test_record_accepts_collection_alias() {
        let item = QueueItem::from_record(&json!({
            "category": "Sega",
            "collection": "MegaDrive",
            "filename": "Sonic (Europe).zip",
            "size": "512 KB"
        }))
        .unwrap();
        assert_eq!(item.collection, "MegaDrive");
        assert_eq!(item.size, "512 KB");
    }

    #[test]
    fn test_legacy_positional_records() {
        let short =
            QueueItem::from_record(&json!(["Nintendo", "NES", "Metroid (USA).zip"])).unwrap();
        assert_eq!(
            short,
            QueueItem::new("Nintendo", "NES", "Metroid (USA).zip")
        );

        let long =
            QueueItem::from_record(&json!(["Nintendo", "NES", "Metroid (USA).zip", "128 KB"]))
                .unwrap();
        assert_eq!(long.size, "128 KB");
    }

    #[test]
    fn test_rejects_malformed_records() {
        assert!(QueueItem::from_record(&json!(["Nintendo", "NES"])).is_none());
        assert!(QueueItem::from_record(&json!(["Nintendo", "NES", 3])).is_none());
        assert!(QueueItem::from_record(&json!({"category": "Nintendo"})).is_none());
        assert!(QueueItem::from_record(&json!(["Nintendo", "NES", "  "])).is_none());
        assert!(QueueItem::from_record(&json!("Metroid.zip")).is_none());
    }
}
