//! gamehub - a game catalog service.
//!
//! Users register, activate their account and log in with bearer tokens.
//! The catalog of games and publishers is gated by permission codes, and
//! activated users buy games into their library with a wallet balance.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod web;

pub use auth::{
    activate, authenticate, authorize, enforce, hash_password, login, logout, register,
    validate_password, verify_password, AccessError, Credentials, Identity, PasswordError,
    RegistrationRequest, Requirement, Token, TokenScope,
};
pub use config::Config;
pub use db::{Database, Game, NewGame, NewUser, User, UserRepository};
pub use error::{FieldErrors, GamehubError, Result};
pub use web::{create_router, WebServer};
