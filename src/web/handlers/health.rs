//! Healthcheck handler.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;
use crate::web::dto::{HealthResponse, SystemInfo};

/// Report that the service is up.
pub async fn healthcheck(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "available",
        system_info: SystemInfo {
            environment: state.env.clone(),
            version: env!("CARGO_PKG_VERSION"),
        },
    })
}
