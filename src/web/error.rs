//! API error handling for the gamehub HTTP API.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AccessError;
use crate::{FieldErrors, GamehubError};

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400) - malformed body or query string.
    BadRequest,
    /// Unauthorized (401) - credentials missing where required, or rejected.
    Unauthorized,
    /// Unauthorized (401) - the bearer token did not resolve.
    InvalidAuthenticationToken,
    /// Forbidden (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Conflict (409) - the record changed since it was read.
    EditConflict,
    /// Validation error (422) - for field-level validation errors.
    ValidationError,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized | ErrorCode::InvalidAuthenticationToken => {
                StatusCode::UNAUTHORIZED
            }
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::EditConflict => StatusCode::CONFLICT,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Field-level validation error details (only present for validation errors).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<FieldErrors>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn details(&self) -> Option<&FieldErrors> {
        self.details.as_ref()
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a not found error.
    pub fn not_found() -> Self {
        Self::new(
            ErrorCode::NotFound,
            "the requested resource could not be found",
        )
    }

    /// Create an edit conflict error.
    pub fn edit_conflict() -> Self {
        Self::new(
            ErrorCode::EditConflict,
            "unable to update the record due to an edit conflict, please try again",
        )
    }

    /// Create an internal server error.
    pub fn internal() -> Self {
        Self::new(
            ErrorCode::InternalError,
            "the server encountered a problem and could not process your request",
        )
    }

    /// Create a validation error with field-level details.
    pub fn validation(details: FieldErrors) -> Self {
        Self {
            code: ErrorCode::ValidationError,
            message: "validation failed".to_string(),
            details: Some(details),
        }
    }

    /// Create a validation error for a single field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut details = FieldErrors::new();
        details.insert(field.into(), message.into());
        Self::validation(details)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        let code = match err {
            AccessError::InvalidToken => ErrorCode::InvalidAuthenticationToken,
            AccessError::InvalidCredentials | AccessError::AuthenticationRequired => {
                ErrorCode::Unauthorized
            }
            AccessError::InactiveAccount | AccessError::NotPermitted => ErrorCode::Forbidden,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<GamehubError> for ApiError {
    fn from(err: GamehubError) -> Self {
        match err {
            GamehubError::Access(access) => access.into(),
            GamehubError::Validation(fields) => ApiError::validation(fields),
            GamehubError::DuplicateEmail => {
                ApiError::field("email", "a user with this email address already exists")
            }
            GamehubError::AlreadyInLibrary => ApiError::field("library", "game already in library"),
            GamehubError::InsufficientFunds => ApiError::field("wallet", "insufficient funds"),
            GamehubError::BalanceLimitExceeded => {
                ApiError::field("wallet", "would exceed the maximum balance")
            }
            GamehubError::EditConflict => ApiError::edit_conflict(),
            GamehubError::NotFound(_) => ApiError::not_found(),
            GamehubError::Password(ref e) if e.is_input_error() => {
                ApiError::field("password", e.to_string())
            }
            other => {
                tracing::error!("Internal error: {}", other);
                ApiError::internal()
            }
        }
    }
}
