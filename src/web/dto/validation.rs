//! Body extractors for Web API DTOs.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::web::error::ApiError;
use crate::GamehubError;

/// A JSON extractor whose rejection is an [`ApiError`] body.
///
/// Use this for payloads validated further down, by the service they are
/// handed to.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// A JSON extractor that validates the request body.
///
/// This extractor deserializes the request body as JSON and then validates it
/// using the `validator` crate. If validation fails, it returns a detailed
/// error response with field-level error information.
///
/// # Example
///
/// ```ignore
/// use gamehub::web::dto::ValidatedJson;
///
/// async fn update_wallet(
///     ValidatedJson(payload): ValidatedJson<WalletUpdateRequest>,
/// ) -> Result<Json<WalletEnvelope>, ApiError> {
///     // payload is already validated
///     // ...
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;

        value
            .validate()
            .map_err(|e| ApiError::from(GamehubError::from(e)))?;

        Ok(ValidatedJson(value))
    }
}

// ============================================================================
// Custom Validators
// ============================================================================

/// Validate that a string is not empty after trimming whitespace.
pub fn not_empty_trimmed(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("not_empty_trimmed")
            .with_message("must be provided".into()));
    }
    Ok(())
}

/// Validate a wallet operation sign.
pub fn wallet_operation(value: &str) -> Result<(), validator::ValidationError> {
    if value != "+" && value != "-" {
        return Err(validator::ValidationError::new("wallet_operation")
            .with_message("must be '+' or '-'".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_trimmed() {
        assert!(not_empty_trimmed("games:read").is_ok());
        assert!(not_empty_trimmed("").is_err());
        assert!(not_empty_trimmed(" \t").is_err());
    }

    #[test]
    fn test_wallet_operation() {
        assert!(wallet_operation("+").is_ok());
        assert!(wallet_operation("-").is_ok());
        assert!(wallet_operation("*").is_err());
        assert!(wallet_operation("").is_err());
    }
}
