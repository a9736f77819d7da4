//! Application Error Types
//!
//! Centralized error taxonomy. Every command failure is turned into the
//! `error` half of a response envelope; nothing here ever crashes a
//! connection handler.

use serde::Serialize;

use super::validation::FieldErrorTree;
use crate::domain::value_objects::IdError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Handshake rejected. Surfaced to the peer only as a refused connection.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Validation failed")]
    Validation(FieldErrorTree),

    /// A referenced id is malformed, unknown or soft-deleted.
    #[error("{0}")]
    Reference(String),

    /// The operation would break an ordering or membership invariant.
    #[error("{0}")]
    InvariantViolation(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error payload placed in the `error` field of a response envelope
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrorTree>,
}

impl AppError {
    /// Shorthand for a reference failure on an unknown or deleted entity.
    pub fn not_found(what: &str) -> Self {
        AppError::Reference(format!("{} not found", what))
    }

    /// Stable numeric code per error class.
    pub fn code(&self) -> u16 {
        match self {
            AppError::Reference(_) => 10001,
            AppError::AuthenticationFailed(_) => 10002,
            AppError::Unauthenticated => 10003,
            AppError::InvariantViolation(_) => 10005,
            AppError::Validation(_) => 10007,
            AppError::Store(_) | AppError::Database(_) | AppError::Internal(_) => 10000,
        }
    }

    /// Failures of the store or of the hub itself, as opposed to a bad
    /// request. Callers log these at error level.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            AppError::Store(_) | AppError::Database(_) | AppError::Internal(_)
        )
    }

    /// Build the structured payload sent back to the client.
    pub fn to_response(&self) -> ErrorResponse {
        match self {
            AppError::Validation(tree) => ErrorResponse {
                code: self.code(),
                message: self.to_string(),
                errors: Some(tree.clone()),
            },
            AppError::Store(_) | AppError::Database(_) | AppError::Internal(_) => ErrorResponse {
                code: self.code(),
                message: "Internal server error".into(),
                errors: None,
            },
            _ => ErrorResponse {
                code: self.code(),
                message: self.to_string(),
                errors: None,
            },
        }
    }
}

impl From<IdError> for AppError {
    fn from(err: IdError) -> Self {
        AppError::Reference(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(FieldErrorTree::from_validation_errors(&errors))
    }
}
