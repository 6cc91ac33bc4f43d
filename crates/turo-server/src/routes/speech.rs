use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use turo_schema::Persona;

use super::{error_response, with_rate_headers, MAX_MESSAGE_CHARS};
use crate::auth::client_ip;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(synthesize))
}

/// Proxies text to the upstream `/audio/speech` endpoint, voiced per persona.
/// Unauthenticated; admission is rate-limited by client address instead.
async fn synthesize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let text = match body.get("text").and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => return error_response(StatusCode::BAD_REQUEST, "text is required"),
    };
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return error_response(StatusCode::BAD_REQUEST, "text exceeds 2000 characters");
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

    let ip = client_ip(&headers);
    let decision = state.speech_limiter.admit(&ip);
    if !decision.allowed {
        return with_rate_headers(
            decision,
            error_response(StatusCode::TOO_MANY_REQUESTS, "too many requests"),
        );
    }

    let Some(tts) = &state.tts else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "speech is not configured");
    };

    let upstream = state
        .http
        .post(format!("{}/audio/speech", tts.base_url()))
        .bearer_auth(&tts.api_key)
        .json(&serde_json::json!({
            "model": tts.model,
            "voice": persona.voice(),
            "input": text,
        }))
        .send()
        .await;

    let response = match upstream {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            tracing::warn!(status = %response.status(), "speech upstream returned an error");
            return error_response(StatusCode::BAD_GATEWAY, "speech synthesis failed");
        }
        Err(err) => {
            tracing::warn!(error = %err, "speech upstream unreachable");
            return error_response(StatusCode::BAD_GATEWAY, "speech synthesis failed");
        }
    };

    match response.bytes().await {
        Ok(audio) => with_rate_headers(
            decision,
            ([(CONTENT_TYPE, "audio/mpeg")], audio).into_response(),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "speech upstream body read failed");
            error_response(StatusCode::BAD_GATEWAY, "speech synthesis failed")
        }
    }
}
