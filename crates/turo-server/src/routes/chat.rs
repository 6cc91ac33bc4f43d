use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use turo_schema::{ChatTurn, Persona, TutorReply};
use turo_store::StoredTurn;

use super::{error_response, with_rate_headers, MAX_MESSAGE_CHARS};
use crate::auth::authenticate;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ChatSuccess {
    pub success: bool,
    pub response: TutorReply,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub turns: Vec<StoredTurn>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/history", get(history))
}

/// The tutoring endpoint. Admission control (identity, input size, persona,
/// rate window) runs to completion before the model is ever involved.
/// Past admission the request always produces a conversational reply; the
/// engine absorbs upstream failure, and persistence failure is logged and
/// swallowed.
async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let Some(user_id) = authenticate(&headers, &state.tokens) else {
        return error_response(StatusCode::UNAUTHORIZED, "authentication required");
    };

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return error_response(StatusCode::BAD_REQUEST, "message exceeds 2000 characters");
    }

    let persona: Persona = match body.get("persona") {
        None | Some(Value::Null) => {
            return error_response(StatusCode::BAD_REQUEST, "persona is required");
        }
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(persona) => persona,
            Err(_) => return error_response(StatusCode::BAD_REQUEST, "unknown persona"),
        },
    };

    let history: Vec<ChatTurn> = match body.get("history") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(history) => history,
            Err(_) => return error_response(StatusCode::BAD_REQUEST, "malformed history"),
        },
    };

    let decision = state.chat_limiter.admit(&user_id);
    if !decision.allowed {
        return with_rate_headers(
            decision,
            error_response(StatusCode::TOO_MANY_REQUESTS, "too many requests"),
        );
    }

    let reply = state.engine.generate(persona, &message, &history).await;

    // Best-effort: the reply is still served if the write fails.
    if let Err(err) = state
        .store
        .append_exchange(&user_id, persona, &message, &reply)
        .await
    {
        tracing::warn!(user_id = %user_id, error = %err, "failed to persist exchange");
    }

    with_rate_headers(
        decision,
        (
            StatusCode::OK,
            Json(ChatSuccess {
                success: true,
                response: reply,
            }),
        )
            .into_response(),
    )
}

async fn history(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user_id) = authenticate(&headers, &state.tokens) else {
        return error_response(StatusCode::UNAUTHORIZED, "authentication required");
    };

    match state.store.recent_turns(&user_id, 50).await {
        Ok(turns) => (StatusCode::OK, Json(HistoryResponse { turns })).into_response(),
        Err(err) => {
            tracing::error!(user_id = %user_id, error = %err, "failed to load history");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}
