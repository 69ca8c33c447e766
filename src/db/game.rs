//! Game repository: catalog CRUD, filtered listing and versioned updates.

use std::borrow::Cow;
use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};
use validator::{Validate, ValidationError};

use super::money::{from_cents, to_cents, validate_price};
use super::{is_foreign_key_violation, versioned_outcome, Database};
use crate::{FieldErrors, GamehubError, Result};

/// Accepted `sort` values; a leading `-` means descending.
pub const SORT_SAFELIST: &[&str] = &[
    "id",
    "title",
    "price",
    "release_date",
    "-id",
    "-title",
    "-price",
    "-release_date",
];

const MAX_TITLE_BYTES: usize = 500;
const MAX_GENRES: usize = 5;
const MAX_PAGE: i64 = 10_000_000;
const MAX_PAGE_SIZE: i64 = 100;

const GAME_COLUMNS: &str = "id, title, genres, release_date, price, publisher_id, version";

/// Game entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Game {
    pub id: i64,
    pub title: String,
    pub genres: Vec<String>,
    pub release_date: NaiveDate,
    pub price: f64,
    pub publisher_id: i64,
    /// Incremented by exactly one on every successful update.
    pub version: i64,
}

#[derive(sqlx::FromRow)]
struct GameRow {
    id: i64,
    title: String,
    genres: Json<Vec<String>>,
    release_date: NaiveDate,
    price: i64,
    publisher_id: i64,
    version: i64,
}

impl From<GameRow> for Game {
    fn from(row: GameRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            genres: row.genres.0,
            release_date: row.release_date,
            price: from_cents(row.price),
            publisher_id: row.publisher_id,
            version: row.version,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CountedGameRow {
    total_records: i64,
    #[sqlx(flatten)]
    game: GameRow,
}

/// Game fields supplied by a client, validated before any write.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewGame {
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    #[validate(custom(function = "validate_genres"))]
    pub genres: Vec<String>,
    #[validate(custom(function = "validate_release_date"))]
    pub release_date: NaiveDate,
    #[validate(custom(function = "validate_price"))]
    pub price: f64,
    #[validate(range(min = 1, message = "must be a positive integer"))]
    pub publisher_id: i64,
}

impl From<&Game> for NewGame {
    fn from(game: &Game) -> Self {
        Self {
            title: game.title.clone(),
            genres: game.genres.clone(),
            release_date: game.release_date,
            price: game.price,
            publisher_id: game.publisher_id,
        }
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn validate_title(title: &str) -> std::result::Result<(), ValidationError> {
    if title.is_empty() {
        return Err(invalid("required", "must be provided"));
    }
    if title.len() > MAX_TITLE_BYTES {
        return Err(invalid("length", "must not be more than 500 bytes long"));
    }
    Ok(())
}

fn validate_genres(genres: &[String]) -> std::result::Result<(), ValidationError> {
    if genres.is_empty() {
        return Err(invalid("required", "must contain at least one genre"));
    }
    if genres.len() > MAX_GENRES {
        return Err(invalid("length", "must not contain more than 5 genres"));
    }
    if genres.iter().any(|g| g.trim().is_empty()) {
        return Err(invalid("empty", "must not contain empty values"));
    }
    let unique: HashSet<&str> = genres.iter().map(String::as_str).collect();
    if unique.len() != genres.len() {
        return Err(invalid("unique", "must not contain duplicate values"));
    }
    Ok(())
}

fn validate_release_date(date: &NaiveDate) -> std::result::Result<(), ValidationError> {
    if *date >= Utc::now().date_naive() {
        return Err(invalid("past", "must be a date before today"));
    }
    Ok(())
}

/// Title, genre and publisher constraints for listing.
#[derive(Debug, Clone, Default)]
pub struct GameFilter {
    /// Case-insensitive substring match; empty matches everything.
    pub title: String,
    /// Every listed genre must be present on the game.
    pub genres: Vec<String>,
    pub publisher_id: Option<i64>,
}

/// Pagination and sort parameters.
#[derive(Debug, Clone)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            sort: "id".to_string(),
        }
    }
}

impl Filters {
    /// Check bounds and the sort safelist.
    pub fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        if self.page < 1 {
            errors.insert("page".into(), "must be greater than zero".into());
        } else if self.page > MAX_PAGE {
            errors.insert("page".into(), "must be a maximum of 10 million".into());
        }
        if self.page_size < 1 {
            errors.insert("page_size".into(), "must be greater than zero".into());
        } else if self.page_size > MAX_PAGE_SIZE {
            errors.insert("page_size".into(), "must be a maximum of 100".into());
        }
        if !SORT_SAFELIST.contains(&self.sort.as_str()) {
            errors.insert("sort".into(), "invalid sort value".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(GamehubError::Validation(errors))
        }
    }

    /// Column named by `sort`; only safelisted values ever reach SQL.
    fn sort_column(&self) -> &'static str {
        let column = self.sort.trim_start_matches('-');
        SORT_SAFELIST
            .iter()
            .find(|safe| **safe == column)
            .copied()
            .unwrap_or("id")
    }

    fn sort_direction(&self) -> &'static str {
        if self.sort.starts_with('-') {
            "DESC"
        } else {
            "ASC"
        }
    }

    fn limit(&self) -> i64 {
        self.page_size
    }

    fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Pagination metadata for a listing; empty when nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

impl Metadata {
    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records == 0 {
            return Self::default();
        }
        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}

/// Make `%`, `_` and `\` match themselves inside a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn map_write_error(e: sqlx::Error) -> GamehubError {
    if is_foreign_key_violation(&e) {
        return GamehubError::field("publisher_id", "must reference an existing publisher");
    }
    e.into()
}

/// Repository for game operations.
pub struct GameRepository<'a> {
    db: &'a Database,
}

impl<'a> GameRepository<'a> {
    /// Create a new repository instance.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a validated game. The stored row starts at version 1.
    pub async fn create(&self, new_game: &NewGame) -> Result<Game> {
        let row: GameRow = self
            .db
            .timed(async {
                sqlx::query_as::<_, GameRow>(&format!(
                    "INSERT INTO games (title, genres, release_date, price, publisher_id)
                     VALUES ($1, $2, $3, $4, $5)
                     RETURNING {GAME_COLUMNS}"
                ))
                .bind(&new_game.title)
                .bind(Json(&new_game.genres))
                .bind(new_game.release_date)
                .bind(to_cents(new_game.price))
                .bind(new_game.publisher_id)
                .fetch_one(self.db.pool())
                .await
                .map_err(map_write_error)
            })
            .await?;

        Ok(row.into())
    }

    /// Get a game by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Game>> {
        let row: Option<GameRow> = self
            .db
            .timed(
                sqlx::query_as::<_, GameRow>(&format!(
                    "SELECT {GAME_COLUMNS} FROM games WHERE id = $1"
                ))
                .bind(id)
                .fetch_optional(self.db.pool()),
            )
            .await?;

        Ok(row.map(Game::from))
    }

    /// Write back every mutable field of `game`.
    ///
    /// The statement only matches while the stored version equals
    /// `game.version`; the new version is returned, or
    /// `GamehubError::EditConflict` if another writer committed first.
    pub async fn update(&self, game: &Game) -> Result<i64> {
        let new_version: Option<i64> = self
            .db
            .timed(async {
                sqlx::query_scalar(
                    "UPDATE games
                     SET title = $1, genres = $2, release_date = $3, price = $4,
                         publisher_id = $5, version = version + 1
                     WHERE id = $6 AND version = $7
                     RETURNING version",
                )
                .bind(&game.title)
                .bind(Json(&game.genres))
                .bind(game.release_date)
                .bind(to_cents(game.price))
                .bind(game.publisher_id)
                .bind(game.id)
                .bind(game.version)
                .fetch_optional(self.db.pool())
                .await
                .map_err(map_write_error)
            })
            .await?;

        versioned_outcome(new_version)
    }

    /// Delete a game. Returns `NotFound` if no row matched.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = self
            .db
            .timed(
                sqlx::query("DELETE FROM games WHERE id = $1")
                    .bind(id)
                    .execute(self.db.pool()),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(GamehubError::NotFound("game".into()));
        }
        Ok(())
    }

    /// Filtered, sorted, paginated listing.
    pub async fn list(&self, filter: &GameFilter, filters: &Filters) -> Result<(Vec<Game>, Metadata)> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT count(*) OVER() AS total_records, {GAME_COLUMNS} FROM games WHERE 1 = 1"
        ));

        if !filter.title.is_empty() {
            query.push(" AND title LIKE '%' || ");
            query.push_bind(escape_like(&filter.title));
            query.push(r" || '%' ESCAPE '\'");
        }
        for genre in &filter.genres {
            query.push(" AND EXISTS (SELECT 1 FROM json_each(games.genres) WHERE value = ");
            query.push_bind(genre.clone());
            query.push(")");
        }
        if let Some(publisher_id) = filter.publisher_id {
            query.push(" AND publisher_id = ");
            query.push_bind(publisher_id);
        }

        query.push(format!(
            " ORDER BY {} {}, id ASC LIMIT ",
            filters.sort_column(),
            filters.sort_direction()
        ));
        query.push_bind(filters.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.offset());

        let rows: Vec<CountedGameRow> = self
            .db
            .timed(query.build_query_as::<CountedGameRow>().fetch_all(self.db.pool()))
            .await?;

        let total = rows.first().map(|r| r.total_records).unwrap_or(0);
        let games = rows.into_iter().map(|r| Game::from(r.game)).collect();

        Ok((games, Metadata::calculate(total, filters.page, filters.page_size)))
    }

    /// Games published by `publisher_id`, ordered by ID.
    pub async fn list_for_publisher(&self, publisher_id: i64) -> Result<Vec<Game>> {
        let rows: Vec<GameRow> = self
            .db
            .timed(
                sqlx::query_as::<_, GameRow>(&format!(
                    "SELECT {GAME_COLUMNS} FROM games WHERE publisher_id = $1 ORDER BY id"
                ))
                .bind(publisher_id)
                .fetch_all(self.db.pool()),
            )
            .await?;

        Ok(rows.into_iter().map(Game::from).collect())
    }

    /// Games in the library of `user_id`, in purchase order.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Game>> {
        let rows: Vec<GameRow> = self
            .db
            .timed(
                sqlx::query_as::<_, GameRow>(
                    "SELECT g.id, g.title, g.genres, g.release_date, g.price, g.publisher_id,
                            g.version
                     FROM games g
                     INNER JOIN library l ON l.game_id = g.id
                     WHERE l.user_id = $1
                     ORDER BY l.id",
                )
                .bind(user_id)
                .fetch_all(self.db.pool()),
            )
            .await?;

        Ok(rows.into_iter().map(Game::from).collect())
    }
}
