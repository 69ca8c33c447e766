//! Permission management handler.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::AppState;
use crate::db::PermissionRepository;
use crate::web::dto::{GrantPermissionRequest, PermissionEnvelope, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::middleware::CurrentUser;
use crate::GamehubError;

/// Grant a permission code to a user. Granting a held code is a no-op.
///
/// POST /v1/permissions
pub async fn grant_permission(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
    ValidatedJson(req): ValidatedJson<GrantPermissionRequest>,
) -> Result<(StatusCode, Json<PermissionEnvelope>), ApiError> {
    PermissionRepository::new(&state.db)
        .add_for_user(req.user_id, &[req.permission.as_str()])
        .await
        .map_err(|e| match e {
            GamehubError::NotFound(what) if what == "permission" => {
                ApiError::field("permission", "unknown permission code")
            }
            GamehubError::NotFound(_) => ApiError::field("user_id", "user does not exist"),
            other => other.into(),
        })?;

    tracing::info!(
        "Permission {} granted to user id={} by user id={}",
        req.permission,
        req.user_id,
        admin.id
    );
    Ok((
        StatusCode::CREATED,
        Json(PermissionEnvelope {
            permission: req.permission,
        }),
    ))
}
