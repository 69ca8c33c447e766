//! Publisher repository (read-only reference data).

use serde::Serialize;

use super::Database;
use crate::Result;

/// Publisher entity.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Publisher {
    pub id: i64,
    pub name: String,
    pub headquarters: String,
    pub website: String,
}

/// Repository for publisher lookups.
pub struct PublisherRepository<'a> {
    db: &'a Database,
}

impl<'a> PublisherRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All publishers ordered by ID.
    pub async fn list(&self) -> Result<Vec<Publisher>> {
        self.db
            .timed(
                sqlx::query_as::<_, Publisher>(
                    "SELECT id, name, headquarters, website FROM publishers ORDER BY id",
                )
                .fetch_all(self.db.pool()),
            )
            .await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Publisher>> {
        self.db
            .timed(
                sqlx::query_as::<_, Publisher>(
                    "SELECT id, name, headquarters, website FROM publishers WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(self.db.pool()),
            )
            .await
    }
}
