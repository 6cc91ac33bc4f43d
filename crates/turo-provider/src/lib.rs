pub mod openai;
pub mod types;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::{OpenAiProvider, ProviderErrorKind};
pub use types::*;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse>;
    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

/// Configuration for the upstream model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    /// OpenAI-compatible base URL; defaults to the OpenAI API.
    #[serde(default)]
    pub base_url: Option<String>,
    pub model: String,
}

impl ProviderConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or("https://api.openai.com/v1")
    }
}

pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    if config.api_key.is_empty() {
        return Err(anyhow!("provider requires a non-empty api_key"));
    }
    Ok(Arc::new(OpenAiProvider::new(
        config.api_key.clone(),
        config.base_url(),
    )))
}

/// Provider that always answers with a fixed text. Useful for wiring tests.
pub struct StubProvider {
    text: String,
}

impl StubProvider {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    async fn chat(&self, _request: LlmRequest) -> Result<LlmResponse> {
        Ok(LlmResponse {
            text: self.text.clone(),
            input_tokens: None,
            output_tokens: None,
            stop_reason: Some("end_turn".into()),
        })
    }
}

/// Provider that plays back a scripted sequence of outcomes, one per call,
/// and counts calls. Used to drive retry paths deterministically in tests.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, _request: LlmRequest) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| anyhow!("scripted provider exhausted"))?;
        match next {
            Ok(text) => Ok(LlmResponse {
                text,
                input_tokens: None,
                output_tokens: None,
                stop_reason: Some("end_turn".into()),
            }),
            Err(message) => Err(anyhow!(message)),
        }
    }
}
