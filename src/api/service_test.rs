use std::collections::HashMap;
use std::sync::Arc;

use super::*;
use crate::config::HttpTimeouts;
use crate::test_helpers::{self, auth_header, logged_in_session};
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete as delete_route, get, post, put};
use axum::Json;

async fn list_documents(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "data": [{ "_id": "d1", "title": "Invoice", "query": params }],
        "pagination": { "total": 21, "page": 3, "limit": 10, "pages": 3 },
    }))
}

async fn login(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "data": {
            "token": "header.payload.sig",
            "user": { "_id": "u1", "email": body["email"], "fullName": "Alice" },
        }
    }))
}

async fn process_ocr(Path(id): Path<String>, Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "data": { "_id": id, "ocrContent": "scanned", "ocrLanguage": body["language"], "ocrConfidence": 88.0 }
    }))
}

async fn share_folder(Path(id): Path<String>, Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "data": { "_id": id, "name": "Taxes", "isPublic": body["isPublic"] } }))
}

async fn profile(headers: HeaderMap) -> Json<Value> {
    Json(json!({ "data": { "_id": "u1", "fullName": "Alice", "seenAuth": auth_header(&headers) } }))
}

fn backend() -> axum::Router {
    axum::Router::new()
        .route("/api/documents", get(list_documents))
        .route("/api/search/documents", get(list_documents))
        .route("/api/auth/login", post(login))
        .route("/api/auth/profile", get(profile))
        .route("/api/documents/{id}/ocr", post(process_ocr))
        .route(
            "/api/documents/{id}/download",
            get(|| async { b"%PDF-1.4".to_vec() }),
        )
        .route("/api/folders/{id}/share", put(share_folder))
        .route("/api/tags/{id}", delete_route(|| async { StatusCode::NO_CONTENT }))
        .route(
            "/api/stats",
            get(|| async { Json(json!({ "data": { "totalDocuments": 4, "totalViews": 9 } })) }),
        )
}

async fn client() -> (ApiClient, test_helpers::TestSession) {
    let ctx = logged_in_session();
    let base = test_helpers::spawn_backend(backend()).await;
    let client = ApiClient::new(&format!("{base}/api"), HttpTimeouts::default(), Arc::clone(&ctx.session)).unwrap();
    (client, ctx)
}

#[tokio::test]
async fn list_documents_sends_filters_and_reads_pagination() {
    let (client, _ctx) = client().await;
    let query = DocumentQuery { search: Some("invoice".into()), page: Some(3), ..DocumentQuery::default() }
        .with_tags(["tax", "2024"]);

    let page = client.documents().list(&query).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.pagination.total, 21);

    let sent = &page.items[0].extra["query"];
    assert_eq!(sent["search"], "invoice");
    assert_eq!(sent["tags"], "tax,2024");
    assert_eq!(sent["page"], "3");
    assert!(sent.get("limit").is_none());
}

#[tokio::test]
async fn search_sends_query_term() {
    let (client, _ctx) = client().await;
    let page = client
        .documents()
        .search(&SearchQuery { q: "receipt", page: None, limit: Some(5) })
        .await
        .unwrap();
    let sent = &page.items[0].extra["query"];
    assert_eq!(sent["q"], "receipt");
    assert_eq!(sent["limit"], "5");
}

#[tokio::test]
async fn login_returns_token_and_profile() {
    let (client, _ctx) = client().await;
    let response = client
        .auth()
        .login(&LoginRequest { email: "alice@example.com", password: "pw" })
        .await
        .unwrap();
    assert_eq!(response.token, "header.payload.sig");
    assert_eq!(response.user.email.as_deref(), Some("alice@example.com"));
}

#[tokio::test]
async fn profile_goes_through_authenticator() {
    let (client, ctx) = client().await;
    let profile = client.auth().profile().await.unwrap();
    let token = ctx.session.token().unwrap();
    assert_eq!(profile.extra["seenAuth"], format!("Bearer {token}"));
}

#[tokio::test]
async fn process_ocr_defaults_language_and_shapes_result() {
    let (client, _ctx) = client().await;

    let result = client.documents().process_ocr("d1", None).await.unwrap();
    assert_eq!(result.ocr_content, "scanned");
    assert_eq!(result.ocr_language.as_deref(), Some(DEFAULT_OCR_LANGUAGE));

    let vie = client.documents().process_ocr("d1", Some("vie")).await.unwrap();
    assert_eq!(vie.ocr_language.as_deref(), Some("vie"));
}

#[tokio::test]
async fn download_returns_raw_bytes() {
    let (client, _ctx) = client().await;
    let bytes = client.documents().download("d1").await.unwrap();
    assert_eq!(bytes, b"%PDF-1.4");
}

#[tokio::test]
async fn share_folder_sends_flag() {
    let (client, _ctx) = client().await;
    let folder = client.folders().share("f9", true).await.unwrap();
    assert_eq!(folder.id, "f9");
    assert!(folder.is_public);
}

#[tokio::test]
async fn delete_accepts_empty_success() {
    let (client, _ctx) = client().await;
    client.tags().delete("t1").await.unwrap();
}

#[tokio::test]
async fn unknown_route_is_api_response_error() {
    let (client, ctx) = client().await;
    let err = client.categories().list().await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(ctx.session.is_authenticated());
}

#[tokio::test]
async fn stats_fill_missing_fields() {
    let (client, _ctx) = client().await;
    let stats = client.stats().await.unwrap();
    assert_eq!(stats.total_documents, 4);
    assert_eq!(stats.total_downloads, 0);
}
