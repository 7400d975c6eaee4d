//! Error types for the filter subsystem

use thiserror::Error;

/// Result type alias for remote query operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Result type alias for filter-panel operations
pub type FilterResult<T> = std::result::Result<T, FilterError>;

/// Failure of a remote report-query call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The remote service could not be reached
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete in time
    #[error("Gateway timeout: {0}")]
    Timeout(String),

    /// The service rejected the query (bad filter, unknown run, ...)
    #[error("Query rejected: {0}")]
    Rejected(String),

    /// The service answered with something we could not interpret
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Returns the error type string (for JSON responses)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "GATEWAY_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Rejected(_) => "QUERY_REJECTED",
            Self::Malformed(_) => "MALFORMED_RESPONSE",
        }
    }

    /// Returns whether the error is transient and could be retried
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// Errors raised by the filter state manager.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Unknown filter facet: {0}")]
    UnknownFacet(String),

    #[error("History key '{key}' is already owned by facet '{owner}'")]
    DuplicateKey { key: String, owner: String },

    #[error("Unknown filter group: {0}")]
    UnknownGroup(String),

    #[error("Facet '{0}' does not support search")]
    SearchUnsupported(String),

    #[error("Stale fetch for facet '{facet}': ticket {ticket} superseded")]
    StaleFetch { facet: String, ticket: u64 },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl FilterError {
    /// Returns the error type string (for JSON responses)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::UnknownFacet(_) | Self::UnknownGroup(_) => "NOT_FOUND",
            Self::DuplicateKey { .. } => "DUPLICATE_KEY",
            Self::SearchUnsupported(_) => "INVALID_ARGUMENT",
            Self::StaleFetch { .. } => "STALE_FETCH",
            Self::Gateway(inner) => inner.error_type(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_retryable_classification() {
        assert!(GatewayError::Unavailable("x".into()).is_retryable());
        assert!(GatewayError::Timeout("x".into()).is_retryable());
        assert!(!GatewayError::Rejected("x".into()).is_retryable());
        assert!(!GatewayError::Malformed("x".into()).is_retryable());
    }

    #[test]
    fn filter_error_delegates_gateway_type() {
        let err: FilterError = GatewayError::Timeout("5s".into()).into();
        assert_eq!(err.error_type(), "TIMEOUT");
        assert_eq!(err.to_string(), "Gateway timeout: 5s");
    }

    #[test]
    fn duplicate_key_display() {
        let err = FilterError::DuplicateKey {
            key: "severity".into(),
            owner: "severity".into(),
        };
        assert_eq!(
            err.to_string(),
            "History key 'severity' is already owned by facet 'severity'"
        );
        assert_eq!(err.error_type(), "DUPLICATE_KEY");
    }
}
