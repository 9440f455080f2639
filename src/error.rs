//! Error types for sharegate.

use thiserror::Error;

use crate::share::{DenyReason, PasswordError};

/// Common error type for sharegate.
#[derive(Error, Debug)]
pub enum SharegateError {
    /// Database error.
    ///
    /// Wraps errors from the record store. Errors from sqlx are converted
    /// automatically.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid owner credential.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The caller is authenticated but does not own the resource.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Share access was denied by the access control evaluator.
    #[error("access denied: {0}")]
    Denied(DenyReason),

    /// A freshly minted share token collided with an existing one.
    #[error("share token already in use")]
    TokenConflict,

    /// Transient blob storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Stored content is missing or does not match its checksum.
    #[error("storage corruption: {0}")]
    StorageCorruption(String),

    /// Password hashing or verification error.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SharegateError {
    /// Get the deny reason if this error is an access denial.
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            SharegateError::Denied(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for SharegateError {
    fn from(e: sqlx::Error) -> Self {
        SharegateError::Database(e.to_string())
    }
}

impl From<DenyReason> for SharegateError {
    fn from(reason: DenyReason) -> Self {
        SharegateError::Denied(reason)
    }
}

/// Result type alias for sharegate operations.
pub type Result<T> = std::result::Result<T, SharegateError>;
