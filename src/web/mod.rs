//! HTTP API for gamehub.
//!
//! Routes live under `/v1`. Every request passes the bearer-token
//! authentication middleware; gated route groups then check the caller
//! against a [`crate::auth::Requirement`].

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
