//! Test helpers for API tests.
//!
//! Provides in-memory and file-backed servers and helpers that walk a user
//! through registration, activation and login.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, StatusCode};
use axum_test::{TestRequest, TestServer};
use gamehub::db::PermissionRepository;
use gamehub::web::{create_router, AppState};
use gamehub::{Config, Database};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const PASSWORD: &str = "pa55word1234";

/// Create a test server backed by an in-memory database.
pub async fn create_test_server() -> (TestServer, Database) {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let state = Arc::new(AppState::new(db.clone(), &Config::default()));
    let server = TestServer::new(create_router(state)).expect("Failed to create test server");
    (server, db)
}

/// Create a test server on a file database with a multi-connection pool.
///
/// Race tests use this so concurrent requests really hit separate
/// connections. Keep the returned directory alive for the whole test.
pub async fn create_file_test_server() -> (TestServer, Database, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = Database::open(dir.path().join("gamehub.db"), 8)
        .await
        .expect("Failed to create test database");
    let state = Arc::new(AppState::new(db.clone(), &Config::default()));
    let server = TestServer::new(create_router(state)).expect("Failed to create test server");
    (server, db, dir)
}

/// Attach a bearer token to a request.
pub fn with_token(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(AUTHORIZATION, format!("Bearer {token}"))
}

/// A registered user as seen by the tests.
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub activation_token: String,
}

/// Register a user and return its ID and activation token.
pub async fn register(server: &TestServer, name: &str, email: &str) -> TestUser {
    let response = server
        .post("/v1/users")
        .json(&json!({ "name": name, "email": email, "password": PASSWORD }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    TestUser {
        id: body["user"]["user"]["id"].as_i64().unwrap(),
        email: email.to_string(),
        activation_token: body["user"]["token"].as_str().unwrap().to_string(),
    }
}

/// Redeem an activation token.
pub async fn activate(server: &TestServer, token: &str) -> Value {
    server
        .put("/v1/users/activated")
        .json(&json!({ "token": token }))
        .await
        .json()
}

/// Log in and return the bearer token.
pub async fn login(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/v1/tokens/authentication")
        .json(&json!({ "email": email, "password": PASSWORD }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    body["authentication_token"]["token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Register, activate and log in; returns the user and its bearer token.
pub async fn activated_user(server: &TestServer, name: &str, email: &str) -> (TestUser, String) {
    let user = register(server, name, email).await;
    activate(server, &user.activation_token).await;
    let token = login(server, email).await;
    (user, token)
}

/// Grant permission codes directly in storage.
pub async fn grant(db: &Database, user_id: i64, codes: &[&str]) {
    PermissionRepository::new(db)
        .add_for_user(user_id, codes)
        .await
        .unwrap();
}

/// An activated user holding `games:write`, with its bearer token.
pub async fn editor(server: &TestServer, db: &Database) -> (TestUser, String) {
    let (user, token) = activated_user(server, "Editor", "editor@example.com").await;
    grant(db, user.id, &["games:write"]).await;
    (user, token)
}

/// Create a game through the API and return its JSON.
pub async fn create_game(server: &TestServer, token: &str, title: &str, price: f64) -> Value {
    let response = with_token(server.post("/v1/games"), token)
        .json(&json!({
            "title": title,
            "genres": ["rpg", "adventure"],
            "release_date": "2015-05-19",
            "price": price,
            "publisher_id": 1
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["game"].clone()
}

/// Top up a wallet through the API.
pub async fn top_up(server: &TestServer, token: &str, amount: f64) {
    with_token(server.patch("/v1/wallet"), token)
        .json(&json!({ "amount": amount, "operation": "+" }))
        .await
        .assert_status_ok();
}
