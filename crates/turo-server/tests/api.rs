use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::util::ServiceExt;
use turo_core::{EngineConfig, TutorEngine};
use turo_provider::{LlmProvider, ScriptedProvider, StubProvider};
use turo_server::rate_limit::{RateLimitConfig, RateLimiter};
use turo_server::state::AppState;
use turo_store::ConversationStore;

fn reply_json() -> String {
    serde_json::json!({
        "tagalog": "Magandang araw! Today's word is `araw` - it means day.",
        "sabihin": "ma-gan-DANG A-raw",
        "meaning": "Good day!",
        "examples": ["Magandang araw po!"],
        "correction": "None",
        "note": null,
    })
    .to_string()
}

fn test_state(provider: Arc<dyn LlmProvider>, chat_limit: u32) -> AppState {
    let store = ConversationStore::open_in_memory().expect("open store");
    AppState {
        engine: Arc::new(TutorEngine::new(provider, EngineConfig::default())),
        store,
        chat_limiter: Arc::new(RateLimiter::new(RateLimitConfig {
            limit: chat_limit,
            ..RateLimitConfig::default()
        })),
        speech_limiter: Arc::new(RateLimiter::new(RateLimitConfig::default())),
        tokens: Arc::new(HashMap::from([(
            "tok-abc".to_string(),
            "user-1".to_string(),
        )])),
        tts: None,
        http: reqwest::Client::new(),
    }
}

fn app(state: &AppState) -> Router {
    turo_server::create_router(state.clone())
}

fn chat_request(token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("build request")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse body")
}

#[tokio::test]
async fn health_is_open() {
    let state = test_state(Arc::new(StubProvider::new(reply_json())), 30);
    let response = app(&state)
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn chat_requires_auth() {
    let scripted = Arc::new(ScriptedProvider::new(vec![Ok(reply_json())]));
    let state = test_state(scripted.clone(), 30);

    let body = r#"{"message":"hello","persona":"ate_maria"}"#;
    let response = app(&state)
        .oneshot(chat_request(None, body))
        .await
        .expect("send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(scripted.calls(), 0);
}

#[tokio::test]
async fn chat_rejects_unknown_token() {
    let state = test_state(Arc::new(StubProvider::new(reply_json())), 30);
    let body = r#"{"message":"hello","persona":"ate_maria"}"#;
    let response = app(&state)
        .oneshot(chat_request(Some("tok-stolen"), body))
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn chat_rejects_missing_or_unknown_persona() {
    let state = test_state(Arc::new(StubProvider::new(reply_json())), 30);

    let response = app(&state)
        .oneshot(chat_request(Some("tok-abc"), r#"{"message":"hello"}"#))
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app(&state)
        .oneshot(chat_request(
            Some("tok-abc"),
            r#"{"message":"hello","persona":"tita_glenda"}"#,
        ))
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_rejects_oversized_message_before_model_call() {
    let scripted = Arc::new(ScriptedProvider::new(vec![Ok(reply_json())]));
    let state = test_state(scripted.clone(), 30);

    let long = "a".repeat(2001);
    let body = serde_json::json!({ "message": long, "persona": "ate_maria" }).to_string();
    let response = app(&state)
        .oneshot(chat_request(Some("tok-abc"), &body))
        .await
        .expect("send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(scripted.calls(), 0);
    // The rejected request must not consume quota.
    let probe = r#"{"message":"hello","persona":"ate_maria"}"#;
    let response = app(&state)
        .oneshot(chat_request(Some("tok-abc"), probe))
        .await
        .expect("send request");
    assert_eq!(
        response.headers().get("x-ratelimit-remaining").unwrap(),
        "29"
    );
}

#[tokio::test]
async fn chat_success_serves_reply_and_persists_both_turns() {
    let state = test_state(Arc::new(StubProvider::new(reply_json())), 30);

    let body = r#"{"message":"hello","persona":"ate_maria","history":[]}"#;
    let response = app(&state)
        .oneshot(chat_request(Some("tok-abc"), body))
        .await
        .expect("send request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-ratelimit-limit").unwrap(), "30");
    assert_eq!(
        response.headers().get("x-ratelimit-remaining").unwrap(),
        "29"
    );
    assert!(response.headers().contains_key("x-ratelimit-reset"));

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(
        json["response"]["sabihin"].as_str().unwrap(),
        "ma-gan-DANG A-raw"
    );
    // The "None" sentinel is normalized away before it reaches the client.
    assert!(json["response"]["correction"].is_null());

    let count = state.store.turn_count("user-1").await.expect("count turns");
    assert_eq!(count, 2);
}

#[tokio::test]
async fn chat_enforces_per_user_window() {
    let scripted = Arc::new(ScriptedProvider::new(vec![
        Ok(reply_json()),
        Ok(reply_json()),
    ]));
    let state = test_state(scripted.clone(), 2);
    let body = r#"{"message":"hello","persona":"kuya_josh"}"#;

    for _ in 0..2 {
        let response = app(&state)
            .oneshot(chat_request(Some("tok-abc"), body))
            .await
            .expect("send request");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app(&state)
        .oneshot(chat_request(Some("tok-abc"), body))
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.headers().get("x-ratelimit-remaining").unwrap(),
        "0"
    );
    assert_eq!(scripted.calls(), 2);
}

#[tokio::test]
async fn chat_history_returns_persisted_turns() {
    let state = test_state(Arc::new(StubProvider::new(reply_json())), 30);

    let body = r#"{"message":"kamusta ka","persona":"kuya_josh"}"#;
    let response = app(&state)
        .oneshot(chat_request(Some("tok-abc"), body))
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&state)
        .oneshot(
            Request::builder()
                .uri("/api/chat/history")
                .header("authorization", "Bearer tok-abc")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let turns = json["turns"].as_array().expect("turns array");
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0]["role"], "user");
    assert_eq!(turns[0]["language"], "english");
    assert_eq!(turns[1]["role"], "assistant");
}

#[tokio::test]
async fn speech_requires_text_and_persona() {
    let state = test_state(Arc::new(StubProvider::new(reply_json())), 30);

    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/speech")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"persona":"ate_maria"}"#))
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/speech")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"text":"Magandang araw"}"#))
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn speech_proxies_audio_with_persona_voice() {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .and(body_partial_json(serde_json::json!({
            "model": "tts-1",
            "voice": "nova",
            "input": "Magandang araw"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3fake-mp3".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let mut state = test_state(Arc::new(StubProvider::new(reply_json())), 30);
    state.tts = Some(turo_server::TtsConfig {
        api_key: "sk-tts".into(),
        base_url: Some(server.uri()),
        model: "tts-1".into(),
    });

    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/speech")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"text":"Magandang araw","persona":"ate_maria"}"#,
                ))
                .expect("build request"),
        )
        .await
        .expect("send request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "audio/mpeg"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    assert_eq!(&bytes[..], b"ID3fake-mp3");
}

#[tokio::test]
async fn speech_reports_unconfigured_upstream() {
    let state = test_state(Arc::new(StubProvider::new(reply_json())), 30);

    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/speech")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"text":"Magandang araw","persona":"ate_maria"}"#,
                ))
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
