use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mailprovider_core::{Category, Classifier, DomainIndex, Snapshot};
use serde_json::Value;
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &std::path::Path) {
    let free = DomainIndex::from_entries(Category::Free, [("gmail.com", 500), ("yahoo.com", 120), ("mail.example.com", 25)]);
    let disposable = DomainIndex::from_entries(Category::Disposable, [("mailinator.com", 40), ("trash.example.com", 10)]);
    free.save(dir).unwrap();
    disposable.save(dir).unwrap();
}

fn app(token: Option<&str>) -> Router {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let snapshot = Snapshot::load(dir.path()).unwrap();
    server::build_app_with_token(Arc::new(Classifier::from_snapshot(snapshot)), token.map(String::from))
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = call(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn check_resolves_registrable_domain() {
    let (status, json) = get(app(None), "/check?email=jane%40inbox.gmail.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reason"], "domain");
    assert_eq!(json["weights"]["free"], 500);
    assert_eq!(json["weights"]["disposable"], 0);
    assert_eq!(json["score"], 1.0);
    assert_eq!(json["domain"], "gmail.com");
}

#[tokio::test]
async fn check_reports_disposable_subdomain() {
    let (status, json) = get(app(None), "/check?email=x%40a.trash.example.com&summarize=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reason"], "subdomain");
    assert_eq!(json["weights"]["disposable"], 10);
    assert_eq!(json["score"], -0.25);
    assert_eq!(json["candidates"][0]["domain"], "trash.example.com");
}

#[tokio::test]
async fn unknown_domain_is_not_found() {
    let (status, json) = get(app(None), "/check?email=someone%40example.org").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reason"], "not_found");
    assert_eq!(json["success"], false);
    assert!(json["score"].is_null());
}

#[tokio::test]
async fn malformed_domain_is_bad_request() {
    let (status, json) = get(app(None), "/check?email=user%40...").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn entries_lists_both_categories() {
    let (status, json) = get(app(None), "/entries?suffix=example.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["free"][0][0], "mail.example.com");
    assert_eq!(json["disposable"][0][1], 10);
}

#[tokio::test]
async fn refresh_requires_admin_token() {
    let req = Request::post("/admin/refresh").body(Body::empty()).unwrap();
    let (status, _) = call(app(Some("secret")), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::post("/admin/refresh").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, _) = call(app(Some("secret")), req).await;
    // An in-memory classifier has no sources to refresh from.
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}
