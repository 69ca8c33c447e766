//! User registration and account activation.

use std::borrow::Cow;

use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationError};

use super::password::{hash_password, validate_password};
use super::token::{validate_plaintext, Token, TokenScope};
use crate::config::AuthConfig;
use crate::db::{
    create_user_on, delete_all_for_user_on, grant_on, insert_token_on, update_user_on, Database,
    NewUser, User, UserRepository,
};
use crate::{GamehubError, Result};

const MAX_NAME_BYTES: usize = 500;

/// Registration request data.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegistrationRequest {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    #[validate(
        length(min = 1, message = "must be provided"),
        email(message = "must be a valid email address")
    )]
    pub email: String,
    #[validate(custom(function = "validate_password_field"))]
    pub password: String,
}

impl RegistrationRequest {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

fn validate_name(name: &str) -> std::result::Result<(), ValidationError> {
    let message = if name.is_empty() {
        "must be provided"
    } else if name.len() > MAX_NAME_BYTES {
        "must not be more than 500 bytes long"
    } else {
        return Ok(());
    };
    let mut err = ValidationError::new("name");
    err.message = Some(Cow::Borrowed(message));
    Err(err)
}

pub(crate) fn validate_password_field(password: &str) -> std::result::Result<(), ValidationError> {
    validate_password(password).map_err(|e| {
        let mut err = ValidationError::new("password");
        err.message = Some(Cow::Owned(e.to_string()));
        err
    })
}

/// Register a new user.
///
/// This function:
/// 1. Validates all input fields
/// 2. Hashes the password
/// 3. Creates the user and an empty wallet
/// 4. Grants the configured default permissions
/// 5. Issues an activation token
///
/// Steps 3 to 5 commit together or not at all. The plaintext of the
/// returned token is the only copy in existence.
pub async fn register(
    db: &Database,
    config: &AuthConfig,
    request: &RegistrationRequest,
) -> Result<(User, Token)> {
    request.validate()?;

    let password_hash = hash_password(&request.password)?;
    let new_user = NewUser::new(&request.name, &request.email, password_hash);
    let defaults: Vec<&str> = config.default_permissions.iter().map(String::as_str).collect();

    let (user, token) = db
        .timed(async {
            let mut tx = db.pool().begin().await?;
            let user = create_user_on(&mut tx, &new_user).await?;
            grant_on(&mut tx, user.id, &defaults).await?;
            let token = Token::generate(user.id, config.activation_ttl(), TokenScope::Activation);
            insert_token_on(&mut tx, &token).await?;
            tx.commit().await?;
            Ok::<_, GamehubError>((user, token))
        })
        .await?;

    info!("User registered: {} (id={})", user.email, user.id);
    Ok((user, token))
}

/// Activate the account owning an activation token.
///
/// On success every outstanding activation token of the user is deleted, so
/// a token can be redeemed at most once.
pub async fn activate(db: &Database, plaintext: &str) -> Result<User> {
    validate_plaintext(plaintext).map_err(|e| GamehubError::field("token", e.to_string()))?;

    let users = UserRepository::new(db);
    let mut user = match users.get_for_token(TokenScope::Activation, plaintext).await {
        Ok(user) => user,
        Err(GamehubError::NotFound(_)) => {
            return Err(GamehubError::field(
                "token",
                "invalid or expired activation token",
            ))
        }
        Err(e) => return Err(e),
    };

    user.activated = true;
    user.version = db
        .timed(async {
            let mut tx = db.pool().begin().await?;
            let version = update_user_on(&mut tx, &user).await?;
            delete_all_for_user_on(&mut tx, TokenScope::Activation, user.id).await?;
            tx.commit().await?;
            Ok::<_, GamehubError>(version)
        })
        .await?;

    info!("User activated: {} (id={})", user.email, user.id);
    Ok(user)
}
