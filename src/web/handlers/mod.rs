//! API handlers.

pub mod games;
pub mod health;
pub mod library;
pub mod permissions;
pub mod publishers;
pub mod tokens;
pub mod users;

pub use games::*;
pub use health::*;
pub use library::*;
pub use permissions::*;
pub use publishers::*;
pub use tokens::*;
pub use users::*;

use axum::extract::{rejection::PathRejection, Path};

use crate::config::{AuthConfig, Config};
use crate::db::Database;
use crate::web::error::ApiError;

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database pool; clones share it.
    pub db: Database,
    /// Token lifetimes and registration defaults.
    pub auth: AuthConfig,
    /// Environment name reported by the healthcheck.
    pub env: String,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, config: &Config) -> Self {
        Self {
            db,
            auth: config.auth.clone(),
            env: config.server.env.clone(),
        }
    }
}

/// Read a positive integer ID from the path; anything else is a 404.
pub(crate) fn read_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    match path {
        Ok(Path(id)) if id >= 1 => Ok(id),
        _ => Err(ApiError::not_found()),
    }
}
