//! Error types for the Spindle library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Spindle operations.
#[derive(Debug, Error)]
pub enum SpindleError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A source table could not be read to completion.
    #[error("ingestion failed for table '{table}': {message}")]
    Ingestion { table: String, message: String },

    /// I/O failure while spilling, merging, or reading a column's data.
    #[error("sort failed for column {id} ('{name}'): {message}")]
    Sort {
        id: usize,
        name: String,
        message: String,
    },

    /// A value file on disk does not match the expected run layout.
    #[error("corrupt value file '{path}': {message}")]
    Corrupt { path: PathBuf, message: String },

    /// Queue or relationship bookkeeping reached an impossible state.
    #[error("discovery invariant violated: {0}")]
    Discovery(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A worker pool channel closed before the phase finished.
    #[error("internal error: {0}")]
    Internal(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpindleError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for Spindle operations.
pub type Result<T> = std::result::Result<T, SpindleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_are_not_discovery_errors() {
        let internal = SpindleError::Internal("worker task channel closed".to_string());
        assert_eq!(
            internal.to_string(),
            "internal error: worker task channel closed"
        );
        assert!(!matches!(internal, SpindleError::Discovery(_)));
    }
}
