//! Game catalog handlers.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use super::{read_id, AppState};
use crate::db::{GameRepository, NewGame};
use crate::web::dto::{
    GameEnvelope, GameListQuery, GamesEnvelope, JsonBody, MessageEnvelope, UpdateGameRequest,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::GamehubError;

/// List games with filters, sorting and pagination.
///
/// GET /v1/games?title=&genres=a,b&publisher_id=&page=&page_size=&sort=
pub async fn list_games(
    State(state): State<Arc<AppState>>,
    query: Result<Query<GameListQuery>, QueryRejection>,
) -> Result<Json<GamesEnvelope>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let (filter, filters) = query.into_filters()?;

    let (games, metadata) = GameRepository::new(&state.db).list(&filter, &filters).await?;
    Ok(Json(GamesEnvelope { games, metadata }))
}

/// GET /v1/games/:id
pub async fn show_game(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<GameEnvelope>, ApiError> {
    let id = read_id(path)?;
    let game = GameRepository::new(&state.db)
        .get_by_id(id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(GameEnvelope { game }))
}

/// POST /v1/games
pub async fn create_game(
    State(state): State<Arc<AppState>>,
    ValidatedJson(new_game): ValidatedJson<NewGame>,
) -> Result<impl IntoResponse, ApiError> {
    let game = GameRepository::new(&state.db).create(&new_game).await?;
    tracing::info!("Game created: {} (id={})", game.title, game.id);

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("/v1/games/{}", game.id))],
        Json(GameEnvelope { game }),
    ))
}

/// Partially update a game.
///
/// If the body carries `version`, it must equal the stored version. The
/// write itself is a compare-and-swap on the version read here, so a
/// concurrent update between read and write is reported as 409 as well.
///
/// PATCH /v1/games/:id
pub async fn update_game(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    JsonBody(req): JsonBody<UpdateGameRequest>,
) -> Result<Json<GameEnvelope>, ApiError> {
    let id = read_id(path)?;
    let repo = GameRepository::new(&state.db);
    let mut game = repo.get_by_id(id).await?.ok_or_else(ApiError::not_found)?;

    if req.version.is_some_and(|expected| expected != game.version) {
        return Err(ApiError::edit_conflict());
    }

    req.apply(&mut game);
    NewGame::from(&game)
        .validate()
        .map_err(GamehubError::from)?;

    game.version = repo.update(&game).await?;
    Ok(Json(GameEnvelope { game }))
}

/// DELETE /v1/games/:id
pub async fn delete_game(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageEnvelope>, ApiError> {
    let id = read_id(path)?;
    GameRepository::new(&state.db).delete(id).await?;
    tracing::info!("Game deleted: id={}", id);
    Ok(Json(MessageEnvelope::new("game successfully deleted")))
}
