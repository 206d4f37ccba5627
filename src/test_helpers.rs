//! Shared fixtures for unit tests.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::api::types::UserProfile;
use crate::guard::RouteGuard;
use crate::router::Router;
use crate::session::{ProfilePolicy, SessionStore};
use crate::storage::MemoryStorage;
use crate::token::now_secs;

/// Build an unsigned three-segment token carrying `claims`.
#[must_use]
pub fn encode_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// Token for `u1` / Alice valid for the next hour.
#[must_use]
pub fn valid_token() -> String {
    token_expiring_in(3600)
}

/// Token for `u1` / Alice that expired an hour ago.
#[must_use]
pub fn expired_token() -> String {
    token_expiring_in(-3600)
}

#[must_use]
pub fn token_expiring_in(secs: i64) -> String {
    encode_token(&serde_json::json!({
        "sub": "u1",
        "name": "Alice",
        "email": "alice@example.com",
        "exp": now_secs() + secs,
    }))
}

#[must_use]
pub fn sample_profile() -> UserProfile {
    serde_json::from_value(serde_json::json!({
        "_id": "u1",
        "email": "alice@example.com",
        "fullName": "Alice Server",
        "role": "user",
    }))
    .expect("sample profile should deserialize")
}

// =============================================================================
// SESSION WIRING
// =============================================================================

/// Storage, router, and session wired the way `AppContext` wires them.
pub struct TestSession {
    pub storage: Arc<MemoryStorage>,
    pub router: Arc<Router>,
    pub session: Arc<SessionStore>,
}

#[must_use]
pub fn test_session(policy: ProfilePolicy) -> TestSession {
    let storage = Arc::new(MemoryStorage::new());
    let router = Arc::new(Router::new(RouteGuard::new(storage.clone())));
    let session = Arc::new(SessionStore::new(storage.clone(), router.clone(), policy));
    TestSession { storage, router, session }
}

/// Test session already logged in as `u1` with a token valid for an hour.
#[must_use]
pub fn logged_in_session() -> TestSession {
    let ctx = test_session(ProfilePolicy::TokenClaims);
    ctx.session.login(&valid_token(), sample_profile());
    ctx
}

// =============================================================================
// MOCK BACKEND
// =============================================================================

/// Serve `app` on an ephemeral local port and return `http://<addr>`.
pub async fn spawn_backend(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend failed");
    });
    format!("http://{addr}")
}

/// Value of the request's `Authorization` header, if any.
#[must_use]
pub fn auth_header(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}
