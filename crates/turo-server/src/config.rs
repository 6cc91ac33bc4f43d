use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use turo_provider::ProviderConfig;

use crate::rate_limit::RateLimitConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    pub provider: ProviderConfig,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Bearer token -> user id. Single-instance deployments provision these
    /// out of band; no OAuth flow lives here.
    #[serde(default)]
    pub tokens: HashMap<String, String>,
    #[serde(default)]
    pub tts: Option<TtsConfig>,
    #[serde(default)]
    pub chat_rate: RateSettings,
    #[serde(default)]
    pub speech_rate: RateSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateSettings {
    #[serde(default = "default_rate_limit")]
    pub limit: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            limit: default_rate_limit(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateSettings {
    pub fn to_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            limit: self.limit,
            window: Duration::from_secs(self.window_secs),
        }
    }
}

/// Upstream speech-synthesis endpoint (OpenAI-compatible `/audio/speech`).
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_tts_model")]
    pub model: String,
}

impl TtsConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or("https://api.openai.com/v1")
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("turo.db")
}

fn default_rate_limit() -> u32 {
    30
}

fn default_window_secs() -> u64 {
    60
}

fn default_tts_model() -> String {
    "tts-1".into()
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: ServerConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}
