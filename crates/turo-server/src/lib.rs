pub mod auth;
pub mod config;
pub mod rate_limit;
pub mod routes;
pub mod state;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use turo_core::{EngineConfig, TutorEngine};
use turo_provider::create_provider;
use turo_store::ConversationStore;

pub use crate::config::{RateSettings, ServerConfig, TtsConfig};
use crate::rate_limit::RateLimiter;
use crate::state::AppState;

/// Wires the engine, store, and limiters from a loaded config file.
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let provider = create_provider(&config.provider)?;
    let engine = TutorEngine::new(
        provider,
        EngineConfig {
            model: config.provider.model.clone(),
            ..EngineConfig::default()
        },
    );
    let store = ConversationStore::open(&config.db_path)?;

    Ok(AppState {
        engine: Arc::new(engine),
        store,
        chat_limiter: Arc::new(RateLimiter::new(config.chat_rate.to_limit_config())),
        speech_limiter: Arc::new(RateLimiter::new(config.speech_rate.to_limit_config())),
        tokens: Arc::new(config.tokens.clone()),
        tts: config.tts.clone(),
        http: reqwest::Client::new(),
    })
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes::api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("turo-server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
