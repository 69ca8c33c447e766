//! Router configuration for Web API.

use axum::{
    http::{
        header::{CONNECTION, VARY},
        HeaderValue,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::error::ApiError;
use super::handlers::{
    activate_user, add_to_library, create_authentication_token, create_game, delete_game,
    grant_permission, healthcheck, list_games, list_publisher_games, list_publishers,
    register_user, remove_from_library, revoke_authentication_tokens, show_game, show_library,
    show_publisher, show_wallet, update_game, update_wallet, AppState,
};
use super::middleware::{authenticate, gated};
use crate::auth::Requirement;

/// Create the main API router.
///
/// Every request is authenticated first; gated route groups then check the
/// resolved identity against their requirement.
pub fn create_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/v1/healthcheck", get(healthcheck))
        .route("/v1/users", post(register_user))
        .route("/v1/users/activated", put(activate_user))
        .route("/v1/tokens/authentication", post(create_authentication_token))
        .route("/v1/publishers", get(list_publishers))
        .route("/v1/publishers/:id", get(show_publisher));

    let session_routes = gated(
        Router::new().route("/v1/tokens/authentication", delete(revoke_authentication_tokens)),
        &state,
        Requirement::Authenticated,
    );

    let account_routes = gated(
        Router::new()
            .route("/v1/library", get(show_library))
            .route(
                "/v1/library/:game_id",
                post(add_to_library).delete(remove_from_library),
            )
            .route("/v1/wallet", get(show_wallet).patch(update_wallet)),
        &state,
        Requirement::Activated,
    );

    let catalog_read_routes = gated(
        Router::new()
            .route("/v1/games", get(list_games))
            .route("/v1/games/:id", get(show_game))
            .route("/v1/publishers/:id/games", get(list_publisher_games)),
        &state,
        Requirement::permission("games:read"),
    );

    let catalog_write_routes = gated(
        Router::new()
            .route("/v1/games", post(create_game))
            .route("/v1/games/:id", patch(update_game).delete(delete_game)),
        &state,
        Requirement::permission("games:write"),
    );

    let admin_routes = gated(
        Router::new().route("/v1/permissions", post(grant_permission)),
        &state,
        Requirement::permission("permissions:write"),
    );

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(account_routes)
        .merge(catalog_read_routes)
        .merge(catalog_write_routes)
        .merge(admin_routes)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(state.clone(), authenticate)),
        )
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

/// Turn a handler panic into the generic 500 body and close the connection.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!("Handler panicked: {}", detail);

    let mut response = ApiError::internal().into_response();
    let headers = response.headers_mut();
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    headers.append(VARY, HeaderValue::from_static("Authorization"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use crate::config::Config;
    use crate::db::Database;

    async fn test_server() -> TestServer {
        let db = Database::open_in_memory().await.unwrap();
        let state = Arc::new(AppState::new(db, &Config::default()));
        TestServer::new(create_router(state)).unwrap()
    }

    #[tokio::test]
    async fn test_healthcheck() {
        let server = test_server().await;
        let response = server.get("/v1/healthcheck").await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "available");
        assert_eq!(body["system_info"]["environment"], "development");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let server = test_server().await;
        let response = server.get("/v1/nothing-here").await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_gated_route_requires_authentication() {
        let server = test_server().await;
        let response = server.get("/v1/games").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("www-authenticate").unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_panic_response() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers().get(CONNECTION).unwrap(), "close");
        assert_eq!(response.headers().get(VARY).unwrap(), "Authorization");
    }
}
