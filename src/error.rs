//! Error types for gamehub.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::auth::{AccessError, PasswordError};

/// Field name to message map carried by validation failures.
pub type FieldErrors = BTreeMap<String, String>;

/// Common error type for gamehub.
#[derive(Error, Debug)]
pub enum GamehubError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant; only the message is kept.
    #[error("database error: {0}")]
    Database(String),

    /// A storage operation did not finish within the configured timeout.
    #[error("database operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication or authorization failure.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Password hashing or verification failure.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Validation error for user input, keyed by field.
    #[error("validation failed: {}", describe_fields(.0))]
    Validation(FieldErrors),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Optimistic-concurrency collision: the stored version moved on.
    #[error("edit conflict")]
    EditConflict,

    /// A user with this email address already exists.
    #[error("duplicate email")]
    DuplicateEmail,

    /// The game is already part of the user's library.
    #[error("game already in library")]
    AlreadyInLibrary,

    /// A guarded debit would have made the balance negative.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// A credit would have pushed the balance past the wallet cap.
    #[error("balance limit exceeded")]
    BalanceLimitExceeded,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GamehubError {
    /// Build a validation error for a single field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), message.into());
        GamehubError::Validation(fields)
    }

    /// Whether this error reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GamehubError::NotFound(_))
    }
}

fn describe_fields(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<sqlx::Error> for GamehubError {
    fn from(e: sqlx::Error) -> Self {
        GamehubError::Database(e.to_string())
    }
}

impl From<validator::ValidationErrors> for GamehubError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_string());
                (field.to_string(), message)
            })
            .collect();
        GamehubError::Validation(fields)
    }
}

/// Result type alias for gamehub operations.
pub type Result<T> = std::result::Result<T, GamehubError>;
