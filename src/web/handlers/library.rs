//! Library and wallet handlers. All require an activated account.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{read_id, AppState};
use crate::db::{LibraryRepository, WalletRepository};
use crate::web::dto::{
    GameListEnvelope, MessageEnvelope, PurchaseEnvelope, ValidatedJson, WalletEnvelope,
    WalletUpdateRequest,
};
use crate::web::error::ApiError;
use crate::web::middleware::CurrentUser;
use crate::GamehubError;

/// GET /v1/library
pub async fn show_library(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<GameListEnvelope>, ApiError> {
    let games = LibraryRepository::new(&state.db).list(user.id).await?;
    Ok(Json(GameListEnvelope { games }))
}

/// Buy a game with the wallet balance.
///
/// POST /v1/library/:game_id
pub async fn add_to_library(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<(StatusCode, Json<PurchaseEnvelope>), ApiError> {
    let game_id = read_id(path)?;
    let (game, wallet) = LibraryRepository::new(&state.db)
        .purchase(user.id, game_id)
        .await?;

    tracing::info!(
        "User id={} bought game id={} for {:.2}",
        user.id,
        game.id,
        game.price
    );
    Ok((StatusCode::CREATED, Json(PurchaseEnvelope { game, wallet })))
}

/// DELETE /v1/library/:game_id
pub async fn remove_from_library(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageEnvelope>, ApiError> {
    let game_id = read_id(path)?;
    LibraryRepository::new(&state.db)
        .remove(user.id, game_id)
        .await?;
    Ok(Json(MessageEnvelope::new("success")))
}

/// GET /v1/wallet
pub async fn show_wallet(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<WalletEnvelope>, ApiError> {
    let wallet = WalletRepository::new(&state.db).get_for_user(user.id).await?;
    Ok(Json(WalletEnvelope { wallet }))
}

/// Top up (`+`) or withdraw (`-`) an amount.
///
/// PATCH /v1/wallet
pub async fn update_wallet(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(req): ValidatedJson<WalletUpdateRequest>,
) -> Result<Json<WalletEnvelope>, ApiError> {
    let wallet = WalletRepository::new(&state.db)
        .apply_delta(user.id, req.delta())
        .await
        .map_err(|e| match e {
            GamehubError::InsufficientFunds => ApiError::field("amount", "insufficient funds"),
            GamehubError::BalanceLimitExceeded => {
                ApiError::field("amount", "would exceed the maximum balance")
            }
            other => other.into(),
        })?;

    Ok(Json(WalletEnvelope { wallet }))
}
