//! Authentication module for gamehub.
//!
//! This module provides password hashing, opaque bearer tokens, request
//! identity resolution, authorization gates, registration and login.

mod gate;
mod identity;
mod password;
mod registration;
mod session;
mod token;

pub use gate::{authorize, enforce, AccessError, Requirement};
pub use identity::{authenticate, parse_bearer, Identity};
pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use registration::{activate, register, RegistrationRequest};
pub use session::{login, logout, Credentials};
pub use token::{
    hash_plaintext, validate_plaintext, Token, TokenError, TokenScope, TOKEN_PLAINTEXT_LENGTH,
};
