//! Publisher handlers.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};
use std::sync::Arc;

use super::{read_id, AppState};
use crate::db::{GameRepository, PublisherRepository};
use crate::web::dto::{GameListEnvelope, PublisherEnvelope, PublishersEnvelope};
use crate::web::error::ApiError;

/// GET /v1/publishers
pub async fn list_publishers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PublishersEnvelope>, ApiError> {
    let publishers = PublisherRepository::new(&state.db).list().await?;
    Ok(Json(PublishersEnvelope { publishers }))
}

/// GET /v1/publishers/:id
pub async fn show_publisher(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<PublisherEnvelope>, ApiError> {
    let id = read_id(path)?;
    let publisher = PublisherRepository::new(&state.db)
        .get_by_id(id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(PublisherEnvelope { publisher }))
}

/// GET /v1/publishers/:id/games
pub async fn list_publisher_games(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<GameListEnvelope>, ApiError> {
    let id = read_id(path)?;
    if PublisherRepository::new(&state.db)
        .get_by_id(id)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found());
    }

    let games = GameRepository::new(&state.db).list_for_publisher(id).await?;
    Ok(Json(GameListEnvelope { games }))
}
