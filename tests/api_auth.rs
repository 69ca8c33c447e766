//! Web API Authentication Tests
//!
//! Registration, activation, login, logout and route gates.

mod common;

use axum::http::StatusCode;
use common::*;
use futures::future::join_all;
use gamehub::db::PermissionRepository;
use serde_json::{json, Value};

// ============================================================================
// Registration Tests
// ============================================================================

#[tokio::test]
async fn test_register_success() {
    let (server, _db) = create_test_server().await;

    let response = server
        .post("/v1/users")
        .json(&json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": PASSWORD
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["user"]["user"]["name"], "Alice");
    assert_eq!(body["user"]["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["user"]["activated"], false);
    assert!(body["user"]["user"].get("password_hash").is_none());
    assert_eq!(body["user"]["token"].as_str().unwrap().len(), 22);
}

#[tokio::test]
async fn test_register_validation_errors() {
    let (server, _db) = create_test_server().await;

    let response = server
        .post("/v1/users")
        .json(&json!({ "name": "", "email": "not-an-email", "password": "short" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let details = &body["error"]["details"];
    assert_eq!(details["name"], "must be provided");
    assert_eq!(details["email"], "must be a valid email address");
    assert!(details["password"].is_string());
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let (server, _db) = create_test_server().await;
    register(&server, "Alice", "alice@example.com").await;

    let response = server
        .post("/v1/users")
        .json(&json!({
            "name": "Alice Again",
            "email": "alice@example.com",
            "password": PASSWORD
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(
        body["error"]["details"]["email"],
        "a user with this email address already exists"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_all_complete() {
    let (server, db, _dir) = create_file_test_server().await;

    let registrations = (0..16).map(|i| {
        let request = server.post("/v1/users").json(&json!({
            "name": format!("User {i}"),
            "email": format!("user{i}@example.com"),
            "password": PASSWORD
        }));
        async move { request.await }
    });
    let responses = join_all(registrations).await;

    for response in &responses {
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let user_id = body["user"]["user"]["id"].as_i64().unwrap();
        let perms = PermissionRepository::new(&db)
            .get_all_for_user(user_id)
            .await
            .unwrap();
        assert_eq!(perms.codes(), vec!["games:read"]);

        let activated = activate(&server, body["user"]["token"].as_str().unwrap()).await;
        assert_eq!(activated["user"]["activated"], true);
    }
}

#[tokio::test]
async fn test_register_malformed_json() {
    let (server, _db) = create_test_server().await;

    let response = server
        .post("/v1/users")
        .text("{\"name\": ")
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// ============================================================================
// Activation Tests
// ============================================================================

#[tokio::test]
async fn test_activation_is_single_use() {
    let (server, _db) = create_test_server().await;
    let user = register(&server, "Alice", "alice@example.com").await;

    let response = server
        .put("/v1/users/activated")
        .json(&json!({ "token": user.activation_token }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"]["activated"], true);
    assert_eq!(body["user"]["id"], user.id);

    let response = server
        .put("/v1/users/activated")
        .json(&json!({ "token": user.activation_token }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(
        body["error"]["details"]["token"],
        "invalid or expired activation token"
    );
}

#[tokio::test]
async fn test_activation_rejects_malformed_token() {
    let (server, _db) = create_test_server().await;

    let response = server
        .put("/v1/users/activated")
        .json(&json!({ "token": "short" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"]["details"]["token"], "must be 22 characters long");
}

// ============================================================================
// Login / Logout Tests
// ============================================================================

#[tokio::test]
async fn test_login_success() {
    let (server, _db) = create_test_server().await;
    register(&server, "Alice", "alice@example.com").await;

    let response = server
        .post("/v1/tokens/authentication")
        .json(&json!({ "email": "alice@example.com", "password": PASSWORD }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(
        body["authentication_token"]["token"].as_str().unwrap().len(),
        22
    );
    assert!(body["authentication_token"]["expiry"].is_string());
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (server, _db) = create_test_server().await;
    register(&server, "Alice", "alice@example.com").await;

    let response = server
        .post("/v1/tokens/authentication")
        .json(&json!({ "email": "alice@example.com", "password": "wrong-password" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], "invalid authentication credentials");
}

#[tokio::test]
async fn test_login_unknown_email_looks_like_wrong_password() {
    let (server, _db) = create_test_server().await;

    let response = server
        .post("/v1/tokens/authentication")
        .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], "invalid authentication credentials");
}

#[tokio::test]
async fn test_logout_revokes_every_token() {
    let (server, _db) = create_test_server().await;
    let (user, first) = activated_user(&server, "Alice", "alice@example.com").await;
    let second = login(&server, &user.email).await;

    with_token(server.delete("/v1/tokens/authentication"), &first)
        .await
        .assert_status_ok();

    for token in [&first, &second] {
        let response = with_token(server.get("/v1/wallet"), token).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "INVALID_AUTHENTICATION_TOKEN");
    }
}

#[tokio::test]
async fn test_logout_requires_authentication() {
    let (server, _db) = create_test_server().await;

    let response = server.delete("/v1/tokens/authentication").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Authentication Middleware Tests
// ============================================================================

#[tokio::test]
async fn test_every_response_varies_on_authorization() {
    let (server, _db) = create_test_server().await;

    let response = server.get("/v1/healthcheck").await;
    response.assert_status_ok();
    assert_eq!(response.headers().get("vary").unwrap(), "Authorization");

    let response = with_token(server.get("/v1/healthcheck"), "AAAAAAAAAAAAAAAAAAAAAA").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get("vary").unwrap(), "Authorization");
}

#[tokio::test]
async fn test_invalid_token_rejected_even_on_public_route() {
    let (server, _db) = create_test_server().await;

    let response = with_token(server.get("/v1/publishers"), "AAAAAAAAAAAAAAAAAAAAAA").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get("www-authenticate").unwrap(), "Bearer");
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_AUTHENTICATION_TOKEN");
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let (server, _db) = create_test_server().await;

    let response = server
        .get("/v1/publishers")
        .add_header(axum::http::header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_AUTHENTICATION_TOKEN");
}

#[tokio::test]
async fn test_empty_authorization_header_is_anonymous() {
    let (server, _db) = create_test_server().await;

    for value in ["", "   "] {
        let response = server
            .get("/v1/publishers")
            .add_header(axum::http::header::AUTHORIZATION, value)
            .await;
        response.assert_status_ok();
        assert_eq!(response.headers().get("vary").unwrap(), "Authorization");

        let response = server
            .get("/v1/wallet")
            .add_header(axum::http::header::AUTHORIZATION, value)
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn test_activation_token_is_not_a_bearer_token() {
    let (server, _db) = create_test_server().await;
    let user = register(&server, "Alice", "alice@example.com").await;

    let response = with_token(server.get("/v1/games"), &user.activation_token).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Gate Tests
// ============================================================================

#[tokio::test]
async fn test_inactive_user_is_forbidden() {
    let (server, _db) = create_test_server().await;
    let user = register(&server, "Alice", "alice@example.com").await;
    let token = login(&server, &user.email).await;

    let response = with_token(server.get("/v1/games"), &token).await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(
        body["error"]["message"],
        "your user account must be activated to access this resource"
    );

    let response = with_token(server.get("/v1/wallet"), &token).await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_permission_is_forbidden() {
    let (server, _db) = create_test_server().await;
    let (_user, token) = activated_user(&server, "Alice", "alice@example.com").await;

    with_token(server.get("/v1/games"), &token)
        .await
        .assert_status_ok();

    let response = with_token(server.post("/v1/games"), &token)
        .json(&json!({
            "title": "Forbidden",
            "genres": ["rpg"],
            "release_date": "2015-05-19",
            "price": 10.0,
            "publisher_id": 1
        }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_grant_permission() {
    let (server, db) = create_test_server().await;
    let (admin, admin_token) = activated_user(&server, "Admin", "admin@example.com").await;
    grant(&db, admin.id, &["permissions:write"]).await;
    let (user, user_token) = activated_user(&server, "Alice", "alice@example.com").await;

    let response = with_token(server.post("/v1/permissions"), &admin_token)
        .json(&json!({ "user_id": user.id, "permission": "games:write" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["permission"], "games:write");

    // Permissions are loaded per request; the existing token sees the grant.
    create_game(&server, &user_token, "Granted", 5.0).await;
}

#[tokio::test]
async fn test_grant_unknown_permission() {
    let (server, db) = create_test_server().await;
    let (admin, admin_token) = activated_user(&server, "Admin", "admin@example.com").await;
    grant(&db, admin.id, &["permissions:write"]).await;

    let response = with_token(server.post("/v1/permissions"), &admin_token)
        .json(&json!({ "user_id": admin.id, "permission": "games:everything" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"]["details"]["permission"], "unknown permission code");

    let response = with_token(server.post("/v1/permissions"), &admin_token)
        .json(&json!({ "user_id": 9999, "permission": "games:write" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"]["details"]["user_id"], "user does not exist");
}

#[tokio::test]
async fn test_grant_requires_permission() {
    let (server, _db) = create_test_server().await;
    let (user, token) = activated_user(&server, "Alice", "alice@example.com").await;

    let response = with_token(server.post("/v1/permissions"), &token)
        .json(&json!({ "user_id": user.id, "permission": "games:write" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}
