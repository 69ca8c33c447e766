//! Request identity and bearer-token authentication.

use tracing::debug;

use super::gate::AccessError;
use super::token::{validate_plaintext, TokenScope};
use crate::db::{Database, User, UserRepository};
use crate::{GamehubError, Result};

/// Who is making a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    /// No credential was presented.
    Anonymous,
    /// A bearer token resolved to this user.
    User(User),
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    /// The resolved user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::User(user) => Some(user),
        }
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The value must be exactly `Bearer <token>`.
pub fn parse_bearer(header: &str) -> std::result::Result<&str, AccessError> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(AccessError::InvalidToken),
    }
}

/// Resolve the `Authorization` header of a request to an identity.
///
/// A missing or blank header yields `Identity::Anonymous`. A malformed
/// header, a malformed token and a token that does not resolve all fail with
/// the same `AccessError::InvalidToken`. Storage failures propagate unchanged.
pub async fn authenticate(db: &Database, header: Option<&str>) -> Result<Identity> {
    let Some(header) = header.filter(|h| !h.trim().is_empty()) else {
        return Ok(Identity::Anonymous);
    };

    let token = parse_bearer(header)?;
    if validate_plaintext(token).is_err() {
        debug!("Rejected malformed bearer token");
        return Err(AccessError::InvalidToken.into());
    }

    match UserRepository::new(db)
        .get_for_token(TokenScope::Authentication, token)
        .await
    {
        Ok(user) => Ok(Identity::User(user)),
        Err(GamehubError::NotFound(_)) => {
            debug!("Bearer token did not resolve to a user");
            Err(AccessError::InvalidToken.into())
        }
        Err(e) => Err(e),
    }
}
