//! Permission registry: per-user permission codes.

use std::collections::HashSet;

use sqlx::SqliteConnection;

use super::{is_foreign_key_violation, Database};
use crate::{GamehubError, Result};

/// The set of permission codes held by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(HashSet<String>);

impl Permissions {
    /// Exact-match membership test.
    pub fn includes(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Codes in sorted order.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.0.iter().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

impl<S: Into<String>> FromIterator<S> for Permissions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Grant `codes` to `user_id` on an open connection.
///
/// The first statement is always a write, so a deferred transaction never
/// has to upgrade a read snapshot under WAL.
pub(crate) async fn grant_on(
    conn: &mut SqliteConnection,
    user_id: i64,
    codes: &[&str],
) -> Result<()> {
    for code in codes {
        let granted = sqlx::query(
            "INSERT OR IGNORE INTO users_permissions (user_id, permission_id)
             SELECT $1, id FROM permissions WHERE code = $2",
        )
        .bind(user_id)
        .bind(*code)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                GamehubError::NotFound("user".into())
            } else {
                e.into()
            }
        })?;

        if granted.rows_affected() == 0 {
            let known: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM permissions WHERE code = $1)")
                    .bind(*code)
                    .fetch_one(&mut *conn)
                    .await?;
            if !known {
                return Err(GamehubError::NotFound("permission".into()));
            }
        }
    }

    // Nothing above touches the foreign key when `codes` is empty or already held.
    let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    if !user_exists {
        return Err(GamehubError::NotFound("user".into()));
    }
    Ok(())
}

/// Repository for permission operations.
pub struct PermissionRepository<'a> {
    db: &'a Database,
}

impl<'a> PermissionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All permission codes granted to `user_id`.
    pub async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions> {
        let codes: Vec<String> = self
            .db
            .timed(
                sqlx::query_scalar(
                    "SELECT p.code
                     FROM permissions p
                     INNER JOIN users_permissions up ON up.permission_id = p.id
                     WHERE up.user_id = $1",
                )
                .bind(user_id)
                .fetch_all(self.db.pool()),
            )
            .await?;

        Ok(codes.into_iter().collect())
    }

    /// Grant `codes` to `user_id`. Codes already held are left untouched.
    ///
    /// Fails with `NotFound("permission")` if a code is unknown, and with
    /// `NotFound("user")` if the user does not exist; nothing is granted then.
    pub async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<()> {
        self.db
            .timed(async {
                let mut tx = self.db.pool().begin().await?;
                grant_on(&mut tx, user_id, codes).await?;
                tx.commit().await?;
                Ok::<(), GamehubError>(())
            })
            .await
    }

    /// Every permission code known to the system.
    pub async fn list_codes(&self) -> Result<Vec<String>> {
        self.db
            .timed(
                sqlx::query_scalar("SELECT code FROM permissions ORDER BY code")
                    .fetch_all(self.db.pool()),
            )
            .await
    }
}
