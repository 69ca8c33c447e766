//! Middleware for Web API.

pub mod auth;
pub mod gate;

pub use auth::{authenticate, CurrentIdentity, CurrentUser};
pub use gate::{gated, require, GateState};
