//! Authorization gates.
//!
//! A [`Requirement`] names what a route needs from the caller. Requirements
//! imply their weaker forms: a permission requires an activated account,
//! which requires an authenticated caller. Checks run weakest first and stop
//! at the first failure.

use thiserror::Error;

use super::identity::Identity;
use crate::db::{Database, PermissionRepository, Permissions};
use crate::Result;

/// Authentication and authorization failures.
///
/// Messages are deliberately generic: an expired token and a forged one are
/// reported the same way.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Malformed, unknown, expired or wrongly scoped bearer token.
    #[error("invalid or missing authentication token")]
    InvalidToken,

    /// Login with an unknown email or a wrong password.
    #[error("invalid authentication credentials")]
    InvalidCredentials,

    /// The route needs a caller but none was identified.
    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    /// The caller's account has not been activated.
    #[error("your user account must be activated to access this resource")]
    InactiveAccount,

    /// The caller lacks the permission code the route needs.
    #[error("your user account doesn't have the necessary permissions to access this resource")]
    NotPermitted,
}

impl AccessError {
    /// Whether this is an authentication (401) rather than authorization (403) failure.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            AccessError::InvalidToken
                | AccessError::InvalidCredentials
                | AccessError::AuthenticationRequired
        )
    }
}

/// What a route requires of its caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Any identified user.
    Authenticated,
    /// An identified user whose account is activated.
    Activated,
    /// An activated user holding this permission code.
    Permission(String),
}

impl Requirement {
    pub fn permission(code: impl Into<String>) -> Self {
        Requirement::Permission(code.into())
    }

    /// The checks this requirement stands for, outermost first.
    pub fn chain(&self) -> Vec<Requirement> {
        match self {
            Requirement::Authenticated => vec![Requirement::Authenticated],
            Requirement::Activated => vec![Requirement::Authenticated, Requirement::Activated],
            Requirement::Permission(_) => vec![
                Requirement::Authenticated,
                Requirement::Activated,
                self.clone(),
            ],
        }
    }

    /// Whether checking this requirement needs the caller's permission set.
    pub fn needs_permissions(&self) -> bool {
        matches!(self, Requirement::Permission(_))
    }
}

/// Evaluate one step of a chain, ignoring what it implies.
fn check_step(
    identity: &Identity,
    step: &Requirement,
    permissions: &Permissions,
) -> std::result::Result<(), AccessError> {
    match step {
        Requirement::Authenticated => identity
            .user()
            .map(|_| ())
            .ok_or(AccessError::AuthenticationRequired),
        Requirement::Activated => match identity.user() {
            Some(user) if user.activated => Ok(()),
            Some(_) => Err(AccessError::InactiveAccount),
            None => Err(AccessError::AuthenticationRequired),
        },
        Requirement::Permission(code) if permissions.includes(code) => Ok(()),
        Requirement::Permission(_) => Err(AccessError::NotPermitted),
    }
}

/// Check `identity` against `requirement` and everything it implies.
pub fn authorize(
    identity: &Identity,
    requirement: &Requirement,
    permissions: &Permissions,
) -> std::result::Result<(), AccessError> {
    requirement
        .chain()
        .iter()
        .try_for_each(|step| check_step(identity, step, permissions))
}

/// Check a requirement against storage.
///
/// The permission set is loaded only after the cheaper checks have passed,
/// and only for permission requirements.
pub async fn enforce(db: &Database, identity: &Identity, requirement: &Requirement) -> Result<()> {
    let empty = Permissions::default();

    if !requirement.needs_permissions() {
        authorize(identity, requirement, &empty)?;
        return Ok(());
    }

    authorize(identity, &Requirement::Activated, &empty)?;
    let Some(user) = identity.user() else {
        return Err(AccessError::AuthenticationRequired.into());
    };
    let permissions = PermissionRepository::new(db).get_all_for_user(user.id).await?;
    authorize(identity, requirement, &permissions)?;
    Ok(())
}
