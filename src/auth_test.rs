use std::sync::{Arc, Mutex};

use super::*;
use crate::config::HttpTimeouts;
use crate::router::{NavigationMode, Navigator};
use crate::session::ProfilePolicy;
use crate::storage::{DurableStorage, TOKEN_KEY, USER_KEY};
use crate::test_helpers::{self, TestSession, valid_token};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use serde_json::{Value, json};

/// Status the mock returns from `GET /auth/profile`.
#[derive(Clone)]
struct Backend {
    token: String,
    profile_status: Arc<Mutex<StatusCode>>,
}

async fn login(State(backend): State<Backend>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "secret" {
        let user = json!({ "_id": "u1", "email": body["email"], "fullName": "Alice" });
        (StatusCode::OK, Json(json!({ "data": { "token": backend.token, "user": user } })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials" })))
    }
}

async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"] == "taken@example.com" {
        (StatusCode::CONFLICT, Json(json!({ "message": "Email already registered" })))
    } else {
        (StatusCode::CREATED, Json(json!({ "message": "ok", "data": { "email": body["email"] } })))
    }
}

async fn profile(State(backend): State<Backend>) -> (StatusCode, Json<Value>) {
    let status = *backend.profile_status.lock().unwrap();
    let body = if status.is_success() {
        json!({ "data": { "_id": "u1", "email": "alice@example.com", "fullName": "Alice Refreshed" } })
    } else {
        json!({ "message": "nope" })
    };
    (status, Json(body))
}

async fn setup() -> (AuthService, TestSession, Backend) {
    let ctx = test_helpers::test_session(ProfilePolicy::ServerProfile);
    let backend = Backend { token: valid_token(), profile_status: Arc::new(Mutex::new(StatusCode::OK)) };
    let app = axum::Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/profile", get(profile))
        .with_state(backend.clone());
    let base = test_helpers::spawn_backend(app).await;
    let api = ApiClient::new(&format!("{base}/api"), HttpTimeouts::default(), ctx.session.clone()).unwrap();
    (AuthService::new(Arc::new(api)), ctx, backend)
}

#[tokio::test]
async fn login_starts_session() {
    let (auth, ctx, backend) = setup().await;

    let user = auth.login("alice@example.com", "secret").await.unwrap();
    assert_eq!(user.full_name.as_deref(), Some("Alice"));
    assert!(ctx.session.is_authenticated());
    assert_eq!(ctx.storage.get(TOKEN_KEY).unwrap(), Some(backend.token));
    let stored: Value = serde_json::from_str(&ctx.storage.get(USER_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored["email"], "alice@example.com");
}

#[tokio::test]
async fn login_rejection_surfaces_server_message() {
    let (auth, ctx, _backend) = setup().await;

    let err = auth.login("alice@example.com", "wrong").await.unwrap_err();
    assert_eq!(err.user_message(LOGIN_FAILED), "Invalid credentials");
    assert!(!ctx.session.is_authenticated());
}

#[tokio::test]
async fn register_does_not_log_in() {
    let (auth, ctx, _backend) = setup().await;

    let body = auth.register("bob@example.com", "pw", "Bob").await.unwrap();
    assert_eq!(body["data"]["email"], "bob@example.com");
    assert!(!ctx.session.is_authenticated());

    let err = auth.register("taken@example.com", "pw", "Bob").await.unwrap_err();
    assert_eq!(err.user_message(REGISTRATION_FAILED), "Email already registered");
}

#[tokio::test]
async fn refresh_profile_updates_session_and_storage() {
    let (auth, ctx, _backend) = setup().await;
    auth.login("alice@example.com", "secret").await.unwrap();
    let token_before = ctx.session.token();

    auth.refresh_profile().await.unwrap();

    assert_eq!(ctx.session.token(), token_before);
    assert_eq!(ctx.session.current_user().unwrap().name.as_deref(), Some("Alice Refreshed"));
    let stored: Value = serde_json::from_str(&ctx.storage.get(USER_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored["fullName"], "Alice Refreshed");
}

#[tokio::test]
async fn refresh_profile_failure_logs_out_once() {
    let (auth, ctx, backend) = setup().await;
    auth.login("alice@example.com", "secret").await.unwrap();
    *backend.profile_status.lock().unwrap() = StatusCode::INTERNAL_SERVER_ERROR;

    assert!(auth.refresh_profile().await.is_err());

    assert!(!ctx.session.is_authenticated());
    assert_eq!(ctx.storage.get(TOKEN_KEY).unwrap(), None);
    let events = ctx.router.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].mode, NavigationMode::Push);
}

#[tokio::test]
async fn refresh_profile_unauthorized_navigates_once() {
    let (auth, ctx, backend) = setup().await;
    auth.login("alice@example.com", "secret").await.unwrap();
    *backend.profile_status.lock().unwrap() = StatusCode::UNAUTHORIZED;

    let err = auth.refresh_profile().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));

    let events = ctx.router.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].mode, NavigationMode::Reload);
}

#[tokio::test]
async fn logout_clears_and_navigates() {
    let (auth, ctx, _backend) = setup().await;
    auth.login("alice@example.com", "secret").await.unwrap();

    auth.logout();

    assert!(!ctx.session.is_authenticated());
    assert_eq!(ctx.router.current().unwrap().path, "/login");
}
