//! Error types for compilation database processing

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for compilation database operations
pub type CompdbResult<T> = std::result::Result<T, CompdbError>;

#[derive(Debug, Error)]
pub enum CompdbError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Entry {index}: {reason}")]
    InvalidEntry { index: usize, reason: String },

    #[error("Entry {index}: cannot split command: {command}")]
    UnparseableCommand { index: usize, command: String },

    #[error("Response file {path}: {reason}")]
    ResponseFile { path: PathBuf, reason: String },

    #[error("Response files nested deeper than {limit} levels at {path}")]
    ResponseDepth { path: PathBuf, limit: usize },
}

impl CompdbError {
    /// Returns the error type string (for JSON responses)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Io { .. } => "IO_ERROR",
            Self::Json(_) => "INVALID_JSON",
            Self::InvalidEntry { .. } | Self::UnparseableCommand { .. } => "INVALID_ENTRY",
            Self::ResponseFile { .. } | Self::ResponseDepth { .. } => "RESPONSE_FILE",
        }
    }
}
