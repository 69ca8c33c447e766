//! User repository: accounts, activation state and token resolution.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;

use super::{is_unique_violation, versioned_outcome, Database};
use crate::auth::{hash_plaintext, TokenScope};
use crate::{GamehubError, Result};

const USER_COLUMNS: &str = "id, name, email, password_hash, activated, version, created_at";

/// User entity.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    /// User ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email address (unique, case-insensitive).
    pub email: String,
    /// Argon2id PHC string.
    #[serde(skip)]
    pub password_hash: String,
    /// Whether the account has been activated.
    pub activated: bool,
    /// Optimistic-concurrency counter.
    #[serde(skip)]
    pub version: i64,
    /// Creation timestamp.
    pub created_at: String,
}

/// New user for creation. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
        }
    }
}

/// Insert a user row and its empty wallet on an open connection.
///
/// The user insert runs first, so inside a transaction the write lock is
/// taken before anything is read.
pub(crate) async fn create_user_on(conn: &mut SqliteConnection, new_user: &NewUser) -> Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(&new_user.name)
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            GamehubError::DuplicateEmail
        } else {
            e.into()
        }
    })?;

    sqlx::query("INSERT INTO wallets (user_id, balance) VALUES ($1, 0)")
        .bind(user.id)
        .execute(&mut *conn)
        .await?;

    Ok(user)
}

/// Versioned write-back of a user on an open connection.
pub(crate) async fn update_user_on(conn: &mut SqliteConnection, user: &User) -> Result<i64> {
    let new_version: Option<i64> = sqlx::query_scalar(
        "UPDATE users
         SET name = $1, email = $2, password_hash = $3, activated = $4,
             version = version + 1
         WHERE id = $5 AND version = $6
         RETURNING version",
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.activated)
    .bind(user.id)
    .bind(user.version)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            GamehubError::DuplicateEmail
        } else {
            GamehubError::from(e)
        }
    })?;

    versioned_outcome(new_version)
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    /// Create a new repository instance.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a user together with an empty wallet.
    ///
    /// Fails with `GamehubError::DuplicateEmail` if the address is taken.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        self.db
            .timed(async {
                let mut tx = self.db.pool().begin().await?;
                let user = create_user_on(&mut tx, new_user).await?;
                tx.commit().await?;
                Ok::<_, GamehubError>(user)
            })
            .await
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        self.db
            .timed(
                sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                    .bind(id)
                    .fetch_optional(self.db.pool()),
            )
            .await
    }

    /// Get a user by email address (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.db
            .timed(
                sqlx::query_as::<_, User>(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
                ))
                .bind(email)
                .fetch_optional(self.db.pool()),
            )
            .await
    }

    /// Write back name, email, password hash and activation flag.
    ///
    /// Succeeds only if the stored version still equals `user.version`;
    /// returns the new version, or `GamehubError::EditConflict`.
    pub async fn update(&self, user: &User) -> Result<i64> {
        self.db
            .timed(async {
                let mut conn = self.db.pool().acquire().await?;
                update_user_on(&mut conn, user).await
            })
            .await
    }

    /// Resolve a plaintext token of the given scope to its owner.
    ///
    /// Wrong token, wrong scope and expired token all yield the same
    /// `GamehubError::NotFound`.
    pub async fn get_for_token(&self, scope: TokenScope, plaintext: &str) -> Result<User> {
        let hash = hash_plaintext(plaintext);
        let now = Utc::now().timestamp();

        let user = self
            .db
            .timed(
                sqlx::query_as::<_, User>(
                    "SELECT u.id, u.name, u.email, u.password_hash, u.activated, u.version,
                            u.created_at
                     FROM users u
                     INNER JOIN tokens t ON t.user_id = u.id
                     WHERE t.hash = $1 AND t.scope = $2 AND t.expiry > $3",
                )
                .bind(hash)
                .bind(scope.as_str())
                .bind(now)
                .fetch_optional(self.db.pool()),
            )
            .await?;

        user.ok_or_else(|| GamehubError::NotFound("token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TokenRepository;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn alice() -> NewUser {
        NewUser::new("Alice", "alice@example.com", "$argon2id$fake")
    }

    #[tokio::test]
    async fn test_create_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);

        let user = repo.create(&alice()).await.unwrap();
        assert!(user.id > 0);
        assert_eq!(user.name, "Alice");
        assert!(!user.activated);
        assert_eq!(user.version, 1);
    }

    #[tokio::test]
    async fn test_create_user_opens_empty_wallet() {
        let db = setup_db().await;
        let user = UserRepository::new(&db).create(&alice()).await.unwrap();

        let balance: i64 = sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
            .bind(user.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(balance, 0);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);
        repo.create(&alice()).await.unwrap();

        let result = repo
            .create(&NewUser::new("Other", "ALICE@example.com", "x"))
            .await;
        assert!(matches!(result, Err(GamehubError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_get_by_email_and_id() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);
        let created = repo.create(&alice()).await.unwrap();

        let by_email = repo.get_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(by_email, created);
        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);

        assert!(repo.get_by_email("bob@example.com").await.unwrap().is_none());
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);
        let mut user = repo.create(&alice()).await.unwrap();

        user.activated = true;
        let version = repo.update(&user).await.unwrap();
        assert_eq!(version, 2);

        let stored = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.activated);
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_update_with_stale_version_conflicts() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);
        let user = repo.create(&alice()).await.unwrap();

        let mut first = user.clone();
        first.name = "Alice A.".into();
        repo.update(&first).await.unwrap();

        let mut stale = user;
        stale.activated = true;
        assert!(matches!(
            repo.update(&stale).await,
            Err(GamehubError::EditConflict)
        ));
    }

    #[tokio::test]
    async fn test_get_for_token_respects_scope_and_expiry() {
        let db = setup_db().await;
        let user = UserRepository::new(&db).create(&alice()).await.unwrap();
        let tokens = TokenRepository::new(&db);
        let users = UserRepository::new(&db);

        let live = tokens
            .issue(user.id, chrono::Duration::hours(1), TokenScope::Activation)
            .await
            .unwrap();
        let expired = tokens
            .issue(user.id, chrono::Duration::hours(-1), TokenScope::Activation)
            .await
            .unwrap();

        let found = users
            .get_for_token(TokenScope::Activation, &live.plaintext)
            .await
            .unwrap();
        assert_eq!(found.id, user.id);

        let wrong_scope = users
            .get_for_token(TokenScope::Authentication, &live.plaintext)
            .await
            .unwrap_err();
        let stale = users
            .get_for_token(TokenScope::Activation, &expired.plaintext)
            .await
            .unwrap_err();
        let unknown = users
            .get_for_token(TokenScope::Activation, "AAAAAAAAAAAAAAAAAAAAAA")
            .await
            .unwrap_err();

        assert_eq!(wrong_scope.to_string(), unknown.to_string());
        assert_eq!(stale.to_string(), unknown.to_string());
        assert!(unknown.is_not_found());
    }
}
