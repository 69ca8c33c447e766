//! User registration and activation handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::AppState;
use crate::auth::{self, RegistrationRequest};
use crate::web::dto::{
    ActivationRequest, JsonBody, Registration, RegistrationEnvelope, UserEnvelope,
};
use crate::web::error::ApiError;

/// Register a new user.
///
/// POST /v1/users
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationEnvelope>), ApiError> {
    let (user, token) = auth::register(&state.db, &state.auth, &req).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationEnvelope {
            user: Registration {
                token: token.plaintext,
                user,
            },
        }),
    ))
}

/// Activate the account owning an activation token.
///
/// PUT /v1/users/activated
pub async fn activate_user(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ActivationRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let user = auth::activate(&state.db, &req.token).await?;
    Ok(Json(UserEnvelope { user }))
}
