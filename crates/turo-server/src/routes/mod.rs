pub mod chat;
pub mod speech;

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::rate_limit::Decision;
use crate::state::AppState;

/// Request bodies above this size are rejected before any model call.
/// Abuse prevention, not a UX decision.
pub const MAX_MESSAGE_CHARS: usize = 2000;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/chat", chat::router())
        .nest("/speech", speech::router())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `{ "error": ... }` envelope used for every admission failure. Internal
/// detail never rides along; it goes to the logs instead.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Attaches the rate-limit metadata headers to any response.
pub(crate) fn with_rate_headers(decision: Decision, mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_epoch_secs));
    response
}
