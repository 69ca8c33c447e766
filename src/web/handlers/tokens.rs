//! Authentication token handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::AppState;
use crate::auth::{self, Credentials};
use crate::web::dto::{AuthenticationTokenEnvelope, JsonBody, MessageEnvelope};
use crate::web::error::ApiError;
use crate::web::middleware::CurrentUser;

/// Log in with email and password.
///
/// POST /v1/tokens/authentication
pub async fn create_authentication_token(
    State(state): State<Arc<AppState>>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<(StatusCode, Json<AuthenticationTokenEnvelope>), ApiError> {
    let token = auth::login(&state.db, &state.auth, &credentials).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthenticationTokenEnvelope {
            authentication_token: token,
        }),
    ))
}

/// Revoke every authentication token of the caller.
///
/// DELETE /v1/tokens/authentication
pub async fn revoke_authentication_tokens(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MessageEnvelope>, ApiError> {
    auth::logout(&state.db, &user).await?;
    Ok(Json(MessageEnvelope::new("authentication tokens revoked")))
}
