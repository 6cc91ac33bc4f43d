use std::collections::HashMap;
use std::sync::Arc;

use turo_core::TutorEngine;
use turo_store::ConversationStore;

use crate::config::TtsConfig;
use crate::rate_limit::RateLimiter;

/// Shared application state accessible from all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TutorEngine>,
    pub store: ConversationStore,
    /// Per-user-id window for the authenticated chat endpoint.
    pub chat_limiter: Arc<RateLimiter>,
    /// Per-client-ip window for the unauthenticated speech endpoint.
    pub speech_limiter: Arc<RateLimiter>,
    /// Bearer token -> user id table from the config file.
    pub tokens: Arc<HashMap<String, String>>,
    pub tts: Option<TtsConfig>,
    /// Client reused for the speech synthesis proxy.
    pub http: reqwest::Client,
}
