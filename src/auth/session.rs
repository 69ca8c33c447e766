//! Login and logout with authentication tokens.

use serde::Deserialize;
use tracing::{debug, info};
use validator::Validate;

use super::gate::AccessError;
use super::password::verify_password;
use super::registration::validate_password_field;
use super::token::{Token, TokenScope};
use crate::config::AuthConfig;
use crate::db::{Database, TokenRepository, User, UserRepository};
use crate::Result;

/// Login request data.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Credentials {
    #[validate(
        length(min = 1, message = "must be provided"),
        email(message = "must be a valid email address")
    )]
    pub email: String,
    #[validate(custom(function = "validate_password_field"))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Exchange email and password for an authentication token.
///
/// Unknown email and wrong password fail identically with
/// `AccessError::InvalidCredentials`. Accounts that are not yet activated
/// may log in; activation is enforced by the route gates.
pub async fn login(db: &Database, config: &AuthConfig, credentials: &Credentials) -> Result<Token> {
    credentials.validate()?;

    let Some(user) = UserRepository::new(db)
        .get_by_email(&credentials.email)
        .await?
    else {
        debug!("Login failed: unknown email");
        return Err(AccessError::InvalidCredentials.into());
    };

    if !verify_password(&credentials.password, &user.password_hash)? {
        debug!("Login failed: wrong password for user id={}", user.id);
        return Err(AccessError::InvalidCredentials.into());
    }

    let token = TokenRepository::new(db)
        .issue(user.id, config.authentication_ttl(), TokenScope::Authentication)
        .await?;

    info!("User logged in: id={}", user.id);
    Ok(token)
}

/// Revoke every authentication token of `user`.
pub async fn logout(db: &Database, user: &User) -> Result<u64> {
    let revoked = TokenRepository::new(db)
        .delete_all_for_user(TokenScope::Authentication, user.id)
        .await?;
    info!("User logged out: id={} ({} tokens revoked)", user.id, revoked);
    Ok(revoked)
}
