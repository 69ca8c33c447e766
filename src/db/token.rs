//! Token repository: persistence of hashed bearer and activation tokens.

use sqlx::SqliteConnection;

use super::Database;
use crate::auth::{Token, TokenScope};
use crate::Result;

pub(crate) async fn insert_token_on(conn: &mut SqliteConnection, token: &Token) -> Result<()> {
    sqlx::query("INSERT INTO tokens (hash, user_id, scope, expiry) VALUES ($1, $2, $3, $4)")
        .bind(&token.hash)
        .bind(token.user_id)
        .bind(token.scope.as_str())
        .bind(token.expiry.timestamp())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn delete_all_for_user_on(
    conn: &mut SqliteConnection,
    scope: TokenScope,
    user_id: i64,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM tokens WHERE scope = $1 AND user_id = $2")
        .bind(scope.as_str())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Repository for token operations.
pub struct TokenRepository<'a> {
    db: &'a Database,
}

impl<'a> TokenRepository<'a> {
    /// Create a new repository instance.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Generate a token for `user_id` and persist its hash.
    ///
    /// The returned value is the only place the plaintext ever exists.
    pub async fn issue(
        &self,
        user_id: i64,
        ttl: chrono::Duration,
        scope: TokenScope,
    ) -> Result<Token> {
        let token = Token::generate(user_id, ttl, scope);
        self.insert(&token).await?;
        Ok(token)
    }

    /// Persist an already generated token.
    pub async fn insert(&self, token: &Token) -> Result<()> {
        self.db
            .timed(async {
                let mut conn = self.db.pool().acquire().await?;
                insert_token_on(&mut conn, token).await
            })
            .await
    }

    /// Delete every token of `scope` belonging to `user_id`.
    ///
    /// Returns the number of tokens removed.
    pub async fn delete_all_for_user(&self, scope: TokenScope, user_id: i64) -> Result<u64> {
        self.db
            .timed(async {
                let mut conn = self.db.pool().acquire().await?;
                delete_all_for_user_on(&mut conn, scope, user_id).await
            })
            .await
    }

    /// Count live and expired tokens of `scope` held by `user_id`.
    pub async fn count_for_user(&self, scope: TokenScope, user_id: i64) -> Result<i64> {
        self.db
            .timed(
                sqlx::query_scalar("SELECT COUNT(*) FROM tokens WHERE scope = $1 AND user_id = $2")
                    .bind(scope.as_str())
                    .bind(user_id)
                    .fetch_one(self.db.pool()),
            )
            .await
    }
}
