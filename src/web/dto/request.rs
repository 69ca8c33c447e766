//! Request DTOs for Web API.

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use super::validation::{not_empty_trimmed, wallet_operation};
use crate::db::{validate_amount, Filters, Game, GameFilter};
use crate::{FieldErrors, GamehubError, Result};

/// Activation request.
#[derive(Debug, Deserialize)]
pub struct ActivationRequest {
    /// Plaintext activation token.
    #[serde(default)]
    pub token: String,
}

/// Partial game update. Absent fields keep their stored values.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateGameRequest {
    pub title: Option<String>,
    pub genres: Option<Vec<String>>,
    pub release_date: Option<NaiveDate>,
    pub price: Option<f64>,
    pub publisher_id: Option<i64>,
    /// Version the client last saw; the update is refused if it is stale.
    pub version: Option<i64>,
}

impl UpdateGameRequest {
    /// Merge the supplied fields into `game`.
    pub fn apply(self, game: &mut Game) {
        if let Some(title) = self.title {
            game.title = title;
        }
        if let Some(genres) = self.genres {
            game.genres = genres;
        }
        if let Some(release_date) = self.release_date {
            game.release_date = release_date;
        }
        if let Some(price) = self.price {
            game.price = price;
        }
        if let Some(publisher_id) = self.publisher_id {
            game.publisher_id = publisher_id;
        }
    }
}

/// Query string of `GET /v1/games`.
///
/// Numbers arrive as strings so that bad input is reported per field.
#[derive(Debug, Default, Deserialize)]
pub struct GameListQuery {
    pub title: Option<String>,
    /// Comma-separated genre list.
    pub genres: Option<String>,
    pub publisher_id: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort: Option<String>,
}

fn read_int(
    value: Option<&str>,
    field: &str,
    default: i64,
    errors: &mut FieldErrors,
) -> i64 {
    match value {
        None | Some("") => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            errors.insert(field.to_string(), "must be an integer value".to_string());
            default
        }),
    }
}

impl GameListQuery {
    /// Split into the listing filter and validated pagination.
    pub fn into_filters(self) -> Result<(GameFilter, Filters)> {
        let mut errors = FieldErrors::new();
        let defaults = Filters::default();

        let publisher_id = read_int(self.publisher_id.as_deref(), "publisher_id", 0, &mut errors);
        let filters = Filters {
            page: read_int(self.page.as_deref(), "page", defaults.page, &mut errors),
            page_size: read_int(
                self.page_size.as_deref(),
                "page_size",
                defaults.page_size,
                &mut errors,
            ),
            sort: self.sort.filter(|s| !s.is_empty()).unwrap_or(defaults.sort),
        };

        if let Err(GamehubError::Validation(more)) = filters.validate() {
            for (field, message) in more {
                errors.entry(field).or_insert(message);
            }
        }
        if !errors.is_empty() {
            return Err(GamehubError::Validation(errors));
        }

        let genres = self
            .genres
            .map(|csv| {
                csv.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let filter = GameFilter {
            title: self.title.unwrap_or_default(),
            genres,
            publisher_id: (publisher_id > 0).then_some(publisher_id),
        };

        Ok((filter, filters))
    }
}

/// Wallet top-up or withdrawal.
#[derive(Debug, Deserialize, Validate)]
pub struct WalletUpdateRequest {
    #[validate(custom(function = "validate_amount"))]
    pub amount: f64,
    #[validate(custom(function = "wallet_operation"))]
    pub operation: String,
}

impl WalletUpdateRequest {
    /// Signed delta to apply to the balance.
    pub fn delta(&self) -> f64 {
        if self.operation == "-" {
            -self.amount
        } else {
            self.amount
        }
    }
}

/// Grant a permission code to a user.
#[derive(Debug, Deserialize, Validate)]
pub struct GrantPermissionRequest {
    #[validate(range(min = 1, message = "must be a positive integer"))]
    pub user_id: i64,
    #[validate(custom(function = "not_empty_trimmed"))]
    pub permission: String,
}
