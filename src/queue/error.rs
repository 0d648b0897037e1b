//! Error types for queue persistence and import.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by queue export, import and persistence.
///
/// In-memory queue operations (add, remove, clear) cannot fail; they report
/// "not added" / "not found" through their return values.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Reading or writing a queue file failed.
    #[error("IO error on queue file {path}: {source}")]
    Io {
        /// Queue file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A queue document is not valid JSON or cannot be serialized.
    #[error("invalid queue document: {source}")]
    Json {
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The document parsed but is not a list of records.
    #[error("queue document must be a JSON array, found {found}")]
    NotAList {
        /// JSON type that was found instead.
        found: &'static str,
    },
}

impl QueueError {
    /// Creates an IO error for a queue file.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a JSON error.
    #[must_use]
    pub fn json(source: serde_json::Error) -> Self {
        Self::Json { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_error_io_display() {
        let error = QueueError::io(
            "/tmp/queue.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let msg = error.to_string();
        assert!(msg.contains("/tmp/queue.json"), "Expected path in: {msg}");
        assert!(msg.contains("missing"), "Expected cause in: {msg}");
    }

    #[test]
    fn test_queue_error_not_a_list_display() {
        let error = QueueError::NotAList { found: "object" };
        assert_eq!(
            error.to_string(),
            "queue document must be a JSON array, found object"
        );
    }
}
