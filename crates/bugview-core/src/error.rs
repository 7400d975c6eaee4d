//! Error types for Bugview core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the core crate
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Enumeration Lookups
    // ==========================================================================
    #[error("Unknown {kind} label: {label}")]
    UnknownLabel { kind: &'static str, label: String },

    #[error("Unknown {kind} code: {code}")]
    UnknownCode { kind: &'static str, code: i32 },

    // ==========================================================================
    // Validation Errors
    // ==========================================================================
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidConfig { key: String, value: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error type string (for JSON responses)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::UnknownLabel { .. } | Self::UnknownCode { .. } => "UNKNOWN_ENUM_VALUE",
            Self::InvalidTimestamp(_) | Self::InvalidRange(_) => "INVALID_ARGUMENT",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::Io(_) => "OS_ERROR",
            Self::Serialization(_) => "TYPE_ERROR",
        }
    }
}
