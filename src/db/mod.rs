//! Database module for gamehub.
//!
//! This module provides SQLite connectivity through a sqlx pool, migration
//! management and the repositories for every table.

mod game;
mod library;
mod money;
mod permission;
mod publisher;
mod schema;
mod token;
mod user;
mod wallet;

pub use game::{Filters, Game, GameFilter, GameRepository, Metadata, NewGame, SORT_SAFELIST};
pub use library::LibraryRepository;
pub use money::{MAX_AMOUNT, MAX_BALANCE_CENTS};
pub use permission::{PermissionRepository, Permissions};
pub use publisher::{Publisher, PublisherRepository};
pub use schema::MIGRATIONS;
pub use token::TokenRepository;
pub use user::{NewUser, User, UserRepository};
pub use wallet::{Wallet, WalletRepository};

pub(crate) use money::validate_amount;
pub(crate) use permission::grant_on;
pub(crate) use token::{delete_all_for_user_on, insert_token_on};
pub(crate) use user::{create_user_on, update_user_on};

use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::{GamehubError, Result};

/// Default bound for a single storage operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(3);

/// Database wrapper around a SQLite connection pool.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    operation_timeout: Duration,
}

impl Database {
    /// Open a database at the specified path.
    ///
    /// The file is created if it doesn't exist. Migrations are applied.
    pub async fn open(path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening database at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        };
        db.migrate().await?;
        Ok(db)
    }

    /// Open an in-memory database for testing.
    ///
    /// The pool holds a single connection that is never recycled, otherwise
    /// each new connection would see an empty database.
    pub async fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory database");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        };
        db.migrate().await?;
        Ok(db)
    }

    /// Override the per-operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The per-operation timeout applied by [`Database::timed`].
    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Run a storage operation bounded by the operation timeout.
    ///
    /// On expiry the future is dropped, which aborts the in-flight statement
    /// (or rolls back an open transaction), and `GamehubError::Timeout` is returned.
    pub async fn timed<T, E, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Into<GamehubError>,
    {
        match tokio::time::timeout(self.operation_timeout, operation).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(GamehubError::Timeout(self.operation_timeout)),
        }
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        if !self.table_exists("schema_version").await? {
            return Ok(0);
        }

        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;

        if current_version as usize >= MIGRATIONS.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            MIGRATIONS.len()
        );

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version     INTEGER PRIMARY KEY,
                applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        for (i, migration) in MIGRATIONS.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            debug!("Migration v{} applied successfully", version);
        }

        info!(
            "Database migration complete (now at version {})",
            MIGRATIONS.len()
        );
        Ok(())
    }

    /// Check if a table exists.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
        )
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

/// Whether a sqlx error is a UNIQUE/PRIMARY KEY constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Whether a sqlx error is a FOREIGN KEY constraint violation.
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Translate the outcome of a `... WHERE id = ? AND version = ? RETURNING version`
/// statement: no row means another writer got there first.
pub(crate) fn versioned_outcome(new_version: Option<i64>) -> Result<i64> {
    new_version.ok_or(GamehubError::EditConflict)
}

/// A migrated file database with a multi-connection pool, for race tests.
///
/// The directory guard must outlive the database.
#[cfg(test)]
pub(crate) async fn open_temp(max_connections: u32) -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("gamehub.db"), max_connections)
        .await
        .unwrap();
    (dir, db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap() as usize, MIGRATIONS.len());
    }

    #[tokio::test]
    async fn test_core_tables_exist() {
        let db = Database::open_in_memory().await.unwrap();
        for table in [
            "users",
            "tokens",
            "permissions",
            "users_permissions",
            "publishers",
            "games",
            "library",
            "wallets",
        ] {
            assert!(db.table_exists(table).await.unwrap(), "missing table {table}");
        }
        assert!(!db.table_exists("nonexistent").await.unwrap());
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().await.unwrap();
        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap() as usize, MIGRATIONS.len());
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");

        {
            let db = Database::open(&db_path, 2).await.unwrap();
            assert!(db.table_exists("users").await.unwrap());
            db.pool().close().await;
        }

        let db = Database::open(&db_path, 2).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap() as usize, MIGRATIONS.len());
    }

    #[tokio::test]
    async fn test_timed_reports_timeout() {
        let db = Database::open_in_memory()
            .await
            .unwrap()
            .with_operation_timeout(Duration::from_millis(10));

        let result: Result<()> = db
            .timed(async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<(), GamehubError>(())
            })
            .await;
        assert!(matches!(result, Err(GamehubError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_timed_passes_through_errors() {
        let db = Database::open_in_memory().await.unwrap();
        let result: Result<i64> = db
            .timed(sqlx::query_scalar("SELECT nope FROM nowhere").fetch_one(db.pool()))
            .await;
        assert!(matches!(result, Err(GamehubError::Database(_))));
    }

    #[test]
    fn test_versioned_outcome() {
        assert_eq!(versioned_outcome(Some(4)).unwrap(), 4);
        assert!(matches!(
            versioned_outcome(None),
            Err(GamehubError::EditConflict)
        ));
    }
}
