//! Route gates built on [`crate::auth::Requirement`].

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::sync::Arc;

use crate::auth::{enforce, Identity, Requirement};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Middleware state: the application and the requirement to enforce.
pub type GateState = (Arc<AppState>, Requirement);

/// Reject the request unless the caller meets the requirement.
///
/// Runs after [`super::authenticate`], which put the identity in the
/// request extensions.
pub async fn require(
    State((app, requirement)): State<GateState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .cloned()
        .unwrap_or(Identity::Anonymous);

    enforce(&app.db, &identity, &requirement).await?;
    Ok(next.run(req).await)
}

/// Gate every route of `router` behind `requirement`.
pub fn gated(
    router: Router<Arc<AppState>>,
    state: &Arc<AppState>,
    requirement: Requirement,
) -> Router<Arc<AppState>> {
    router.route_layer(middleware::from_fn_with_state(
        (state.clone(), requirement),
        require,
    ))
}
