//! Common Error Types
//!
//! Unified error handling with the plugin exit-code convention.

use thiserror::Error;

/// Exit codes shared by every xwander plugin CLI
///
/// 0 is success and is never represented here. `RateLimit` and
/// `Authentication` are reserved for vendor call failures, which callers
/// raise themselves; no `XwanderError` maps to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Generic = 1,
    RateLimit = 2,
    Authentication = 3,
    NotFound = 4,
    Validation = 5,
    Batch = 6,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

/// Library error type
#[derive(Debug, Error)]
pub enum XwanderError {
    /// A structural rule of a query was violated at build or validate time
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Invalid chunk size {0}: must be at least 1")]
    InvalidChunkSize(usize),

    #[error("Formula error: {0}")]
    Formula(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    /// A named lookup (report template, ...) has no match
    #[error("Not found: {0}")]
    NotFound(String),

    /// A batched run finished with some items failed
    #[error("{failed} of {total} items failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl XwanderError {
    pub fn malformed_query(message: impl Into<String>) -> Self {
        Self::MalformedQuery(message.into())
    }

    pub fn formula(message: impl Into<String>) -> Self {
        Self::Formula(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Exit code a CLI should terminate with for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedQuery(_)
            | Self::InvalidChunkSize(_)
            | Self::Formula(_)
            | Self::Config(_) => ErrorCode::Validation,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::PartialFailure { .. } => ErrorCode::Batch,
            Self::Export(_) | Self::Io(_) | Self::Json(_) => ErrorCode::Generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_map_to_exit_code_5() {
        assert_eq!(XwanderError::malformed_query("x").code().code(), 5);
        assert_eq!(XwanderError::InvalidChunkSize(0).code(), ErrorCode::Validation);
        assert_eq!(XwanderError::formula("x").code(), ErrorCode::Validation);
    }

    #[test]
    fn test_message_names_the_rule() {
        let err = XwanderError::InvalidChunkSize(0);
        assert_eq!(err.to_string(), "Invalid chunk size 0: must be at least 1");

        let err = XwanderError::malformed_query("SELECT clause is required");
        assert!(err.to_string().contains("SELECT clause is required"));
    }

    #[test]
    fn test_partial_failure_maps_to_batch_code() {
        let err = XwanderError::PartialFailure { failed: 10, total: 25 };
        assert_eq!(err.code(), ErrorCode::Batch);
        assert_eq!(err.to_string(), "10 of 25 items failed");
    }

    #[test]
    fn test_exit_code_table() {
        assert_eq!(ErrorCode::Generic.code(), 1);
        assert_eq!(ErrorCode::RateLimit.code(), 2);
        assert_eq!(ErrorCode::Authentication.code(), 3);
        assert_eq!(ErrorCode::NotFound.code(), 4);
        assert_eq!(ErrorCode::Batch.code(), 6);

        let err = XwanderError::not_found("template 'x'");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.to_string(), "Not found: template 'x'");
    }
}
