use super::*;
use crate::router::NavigationMode;
use crate::storage::{DurableStorage, TOKEN_KEY, USER_KEY};
use crate::test_helpers::{self, auth_header, expired_token, logged_in_session, sample_profile, valid_token};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Json;
use serde_json::{Value, json};
use tokio::sync::Notify;

/// Lets a test hold a request on the server until it has changed the session.
#[derive(Clone, Default)]
struct Gate {
    arrived: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    async fn hold(&self) {
        self.arrived.notify_one();
        self.release.notified().await;
    }
}

async fn echo(headers: HeaderMap) -> Json<Value> {
    Json(json!({ "data": { "authorization": auth_header(&headers) } }))
}

async fn gated(State(gate): State<Gate>) -> Json<Value> {
    gate.hold().await;
    Json(json!({ "data": { "ok": true } }))
}

async fn gated_reject(State(gate): State<Gate>) -> (StatusCode, Json<Value>) {
    gate.hold().await;
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Token revoked" })))
}

fn backend(gate: Gate) -> axum::Router {
    axum::Router::new()
        .route("/api/echo", get(echo))
        .route(
            "/api/reject",
            get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid token" }))) }),
        )
        .route("/api/boom", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route("/api/gated", get(gated))
        .route("/api/gated-reject", get(gated_reject))
        .with_state(gate)
}

async fn client_for(session: Arc<SessionStore>) -> (ApiClient, Gate) {
    let gate = Gate::default();
    let base = test_helpers::spawn_backend(backend(gate.clone())).await;
    let client = ApiClient::new(&format!("{base}/api"), HttpTimeouts::default(), session).unwrap();
    (client, gate)
}

// =============================================================================
// REQUEST INTERCEPTOR
// =============================================================================

#[tokio::test]
async fn attaches_bearer_for_valid_token() {
    let ctx = logged_in_session();
    let token = ctx.session.token().unwrap();
    let (client, _gate) = client_for(ctx.session.clone()).await;

    let data: Value = client.get_data("/echo").await.unwrap();
    assert_eq!(data["authorization"], format!("Bearer {token}"));
}

#[tokio::test]
async fn sends_no_header_when_logged_out() {
    let ctx = test_helpers::test_session(crate::session::ProfilePolicy::TokenClaims);
    let (client, _gate) = client_for(ctx.session.clone()).await;

    let data: Value = client.get_data("/echo").await.unwrap();
    assert!(data["authorization"].is_null());
}

#[tokio::test]
async fn expired_token_is_cleared_and_not_sent() {
    let ctx = test_helpers::test_session(crate::session::ProfilePolicy::TokenClaims);
    ctx.session.login(&expired_token(), sample_profile());
    let (client, _gate) = client_for(ctx.session.clone()).await;

    let data: Value = client.get_data("/echo").await.unwrap();
    assert!(data["authorization"].is_null());
    assert!(ctx.session.token().is_none());
    assert_eq!(ctx.storage.get(TOKEN_KEY).unwrap(), None);
    // Dropping an expired credential before dispatch does not navigate.
    assert!(ctx.router.events().is_empty());
}

// =============================================================================
// RESPONSE INTERCEPTOR
// =============================================================================

#[tokio::test]
async fn unauthorized_clears_session_and_reloads_to_login() {
    let ctx = logged_in_session();
    let (client, _gate) = client_for(ctx.session.clone()).await;

    let err = client.get_data::<Value>("/reject").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(err.user_message("Request failed"), "Invalid token");

    assert!(!ctx.session.is_authenticated());
    assert_eq!(ctx.storage.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(ctx.storage.get(USER_KEY).unwrap(), None);

    let events = ctx.router.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].location.path, "/login");
    assert_eq!(events[0].mode, NavigationMode::Reload);
}

#[tokio::test]
async fn stale_unauthorized_does_not_touch_new_session() {
    let ctx = logged_in_session();
    let (client, gate) = client_for(ctx.session.clone()).await;
    let client = Arc::new(client);

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.get_data::<Value>("/gated-reject").await }
    });
    gate.arrived.notified().await;

    ctx.session.logout(false);
    let fresh = valid_token();
    ctx.session.login(&fresh, sample_profile());
    gate.release.notify_one();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(ApiError::Unauthorized { .. })));
    assert_eq!(ctx.session.token().as_deref(), Some(fresh.as_str()));
    assert_eq!(ctx.storage.get(TOKEN_KEY).unwrap().as_deref(), Some(fresh.as_str()));
    assert!(ctx.router.events().is_empty());
}

#[tokio::test]
async fn response_after_logout_is_discarded() {
    let ctx = logged_in_session();
    let (client, gate) = client_for(ctx.session.clone()).await;
    let client = Arc::new(client);

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.get_data::<Value>("/gated").await }
    });
    gate.arrived.notified().await;
    ctx.session.logout(false);
    gate.release.notify_one();

    assert!(matches!(pending.await.unwrap(), Err(ApiError::SessionChanged)));
}

#[tokio::test]
async fn other_failures_propagate_without_invalidating() {
    let ctx = logged_in_session();
    let (client, _gate) = client_for(ctx.session.clone()).await;

    let err = client.get_data::<Value>("/boom").await.unwrap_err();
    assert!(matches!(err, ApiError::ApiResponse { status: 500, .. }));
    assert!(ctx.session.is_authenticated());
    assert!(ctx.router.events().is_empty());
}

#[tokio::test]
async fn transport_failure_is_api_request_error() {
    let ctx = logged_in_session();
    let client = ApiClient::new("http://127.0.0.1:9/api", HttpTimeouts::default(), ctx.session.clone()).unwrap();

    let err = client.get_data::<Value>("/echo").await.unwrap_err();
    assert!(matches!(err, ApiError::ApiRequest(_)));
    assert!(ctx.session.is_authenticated());
}

// =============================================================================
// HELPERS
// =============================================================================

#[test]
fn endpoint_url_joins_with_one_slash() {
    assert_eq!(endpoint_url("http://h/api/", "/documents"), "http://h/api/documents");
    assert_eq!(endpoint_url("http://h/api", "documents"), "http://h/api/documents");
}

#[test]
fn parse_json_reports_shape_errors() {
    let err = parse_json::<Envelope<Vec<String>>>(r#"{"data": 3}"#).unwrap_err();
    assert!(matches!(err, ApiError::ApiParse(_)));
}
