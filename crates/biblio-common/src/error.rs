//! Error types and error codes for Biblio
//!
//! This module defines:
//! - `BiblioError`: the transition failure taxonomy shared by every layer
//! - `ErrorCode`: Structured error codes for API responses

use serde::{Deserialize, Serialize};

/// Message returned to callers for infrastructure failures.
///
/// Storage details stay in the logs.
pub const INTERNAL_FAILURE_MESSAGE: &str = "Internal server error";

/// Failure kinds surfaced by the lending core
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BiblioError {
    /// Lock contention, retryable by the caller
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Business-rule violation, e.g. double return
    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("internal error: {0}")]
    InternalFailure(String),
}

impl BiblioError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalFailure(message.into())
    }

    pub fn error_code(&self) -> ErrorCode<'static> {
        match self {
            Self::Conflict(_) => RESOURCE_CONFLICT,
            Self::NotFound(_) => RESOURCE_NOT_FOUND,
            Self::InvalidState(_) => ILLEGAL_STATE,
            Self::ValidationFailed(_) => PARAMETER_VALIDATE_ERROR,
            Self::InternalFailure(_) => SERVER_ERROR,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::Conflict(_) => 409,
            Self::NotFound(_) => 404,
            Self::InvalidState(_) | Self::ValidationFailed(_) => 400,
            Self::InternalFailure(_) => 500,
        }
    }

    /// Human-readable reason safe to send to clients
    pub fn public_message(&self) -> String {
        match self {
            Self::InternalFailure(_) => INTERNAL_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<anyhow::Error> for BiblioError {
    fn from(value: anyhow::Error) -> Self {
        Self::InternalFailure(format!("{:#}", value))
    }
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const RESOURCE_CONFLICT: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "resource conflict",
};

pub const ILLEGAL_STATE: ErrorCode<'static> = ErrorCode {
    code: 23000,
    message: "illegal state",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biblio_error_display() {
        let err = BiblioError::conflict("busy");
        assert_eq!(format!("{}", err), "busy");

        let err = BiblioError::internal("connection reset");
        assert_eq!(format!("{}", err), "internal error: connection reset");
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(BiblioError::conflict("x").http_status(), 409);
        assert_eq!(BiblioError::not_found("x").http_status(), 404);
        assert_eq!(BiblioError::invalid_state("x").http_status(), 400);
        assert_eq!(BiblioError::validation("x").http_status(), 400);
        assert_eq!(BiblioError::internal("x").http_status(), 500);
    }

    #[test]
    fn test_internal_failure_hides_details() {
        let err = BiblioError::internal("duplicate key value violates constraint");
        assert_eq!(err.public_message(), INTERNAL_FAILURE_MESSAGE);

        let err = BiblioError::not_found("Book not found");
        assert_eq!(err.public_message(), "Book not found");
    }

    #[test]
    fn test_from_anyhow() {
        let err: BiblioError = anyhow::anyhow!("db down").into();
        assert!(matches!(err, BiblioError::InternalFailure(ref m) if m == "db down"));
    }

    #[test]
    fn test_error_code_constants() {
        assert_eq!(SUCCESS.code, 0);
        assert_eq!(SUCCESS.message, "success");
        assert_eq!(BiblioError::conflict("x").error_code(), RESOURCE_CONFLICT);
        assert_eq!(BiblioError::not_found("x").error_code().code, 20004);
        assert_eq!(BiblioError::validation("x").error_code().code, 20002);
    }
}
