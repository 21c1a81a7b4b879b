//! Error types for samtest-core.
//!
//! All errors are explicit values; nothing in this crate panics on bad input.

use std::path::PathBuf;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while loading templates, suites and configuration.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The infrastructure template could not be read.
    #[error("template not found: {}", path.display())]
    TemplateNotFound {
        /// Path that was tried.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A test record is not shaped the way the registry expects.
    #[error("invalid test record for {function}: {reason}")]
    InvalidRecord {
        /// Logical function name the record belongs to.
        function: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A suite file could not be parsed.
    #[error("failed to parse suite {}: {reason}", path.display())]
    Suite {
        /// Suite file.
        path: PathBuf,
        /// Parse failure.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an invalid-record error.
    #[must_use]
    pub fn invalid_record(function: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            function: function.into(),
            reason: reason.into(),
        }
    }
}
