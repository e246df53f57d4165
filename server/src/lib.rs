use axum::{extract::{Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use mailprovider_core::{CheckResult, Classifier, Error, ErrorKind, SuffixEntries};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct CheckParams {
    pub email: String,
    #[serde(default)]
    pub summarize: bool,
}

#[derive(Deserialize)]
pub struct EntriesParams {
    pub suffix: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub total: usize,
    pub fetched: usize,
    pub failed: Vec<String>,
    pub rebuilt: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<Classifier>,
    pub admin_token: Option<String>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(err: Error) -> ApiError {
    let status = match (&err, err.kind()) {
        (Error::NoSources, _) => StatusCode::NOT_IMPLEMENTED,
        (_, ErrorKind::Client) => StatusCode::BAD_REQUEST,
        (_, ErrorKind::Server) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    (status, Json(serde_json::json!({ "success": false, "error": err.to_string() })))
}

pub fn build_app(classifier: Arc<Classifier>) -> Router {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    build_app_with_token(classifier, admin_token)
}

pub fn build_app_with_token(classifier: Arc<Classifier>, admin_token: Option<String>) -> Router {
    let app_state = AppState { classifier, admin_token };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/check", get(check_handler))
        .route("/entries", get(entries_handler))
        .route("/admin/refresh", post(refresh_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn check_handler(State(state): State<AppState>, Query(params): Query<CheckParams>) -> Result<Json<CheckResult>, ApiError> {
    state.classifier.check(&params.email, params.summarize).map(Json).map_err(api_error)
}

pub async fn entries_handler(State(state): State<AppState>, Query(params): Query<EntriesParams>) -> Json<SuffixEntries> {
    Json(state.classifier.entries_with_suffix(&params.suffix))
}

async fn refresh_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<RefreshResponse>, ApiError> {
    authorize(&state, &headers)?;
    let report = state.classifier.refresh().await.map_err(api_error)?;
    Ok(Json(RefreshResponse {
        total: report.total,
        fetched: report.fetched.len(),
        failed: report.failed.iter().map(ToString::to_string).collect(),
        rebuilt: report.rebuilt(),
    }))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let unauthorized = |msg: &str| (StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "success": false, "error": msg })));
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(unauthorized("ADMIN_TOKEN not set")),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(unauthorized("invalid admin token"))
    }
}
