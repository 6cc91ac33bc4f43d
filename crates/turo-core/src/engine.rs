//! Generation orchestration: builds model context, drives the retry loop
//! and guarantees a usable reply.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use turo_provider::{LlmMessage, LlmProvider, LlmRequest};
use turo_schema::{ChatTurn, Persona, SkillMode, TutorReply};

use crate::prompt;
use crate::validate;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model: String,
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    /// Most recent history turns included in model context.
    pub history_window: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(30),
            history_window: 15,
            temperature: 0.7,
            max_tokens: 400,
        }
    }
}

/// Retry-loop state. A parse or validation failure and a transport failure
/// are the same thing here: one spent attempt.
enum Attempt {
    Trying(u32),
    Succeeded(TutorReply),
    Exhausted,
}

pub struct TutorEngine {
    provider: Arc<dyn LlmProvider>,
    config: EngineConfig,
}

impl TutorEngine {
    pub fn new(provider: Arc<dyn LlmProvider>, config: EngineConfig) -> Self {
        Self { provider, config }
    }

    /// Model context for one request: the windowed history (assistant turns
    /// as the JSON of their prior reply) followed by the user turn. An empty
    /// utterance becomes the persona's greeting trigger so the model opens
    /// the conversation.
    pub fn build_messages(
        &self,
        persona: Persona,
        user_text: &str,
        history: &[ChatTurn],
    ) -> Vec<LlmMessage> {
        let start = history.len().saturating_sub(self.config.history_window);
        let mut messages: Vec<LlmMessage> = history[start..]
            .iter()
            .map(|turn| LlmMessage {
                role: turn.role.as_str().to_string(),
                content: turn.model_text(),
            })
            .collect();

        let user_text = if user_text.trim().is_empty() {
            persona.greeting_trigger().to_string()
        } else {
            user_text.to_string()
        };
        messages.push(LlmMessage::user(user_text));
        messages
    }

    /// Produces a validated reply, or the persona's fixed fallback once the
    /// attempt budget is spent. Never returns an error to the caller.
    pub async fn generate(
        &self,
        persona: Persona,
        user_text: &str,
        history: &[ChatTurn],
    ) -> TutorReply {
        let system = prompt::compose(persona);
        let messages = self.build_messages(persona, user_text, history);

        let mut state = Attempt::Trying(1);
        loop {
            match state {
                Attempt::Trying(n) => {
                    state = match self.attempt(&system, &messages).await {
                        Ok(reply) => Attempt::Succeeded(reply),
                        Err(err) => {
                            tracing::warn!(
                                attempt = n,
                                persona = persona.as_str(),
                                error = %err,
                                "generation attempt failed"
                            );
                            if n >= self.config.max_attempts {
                                Attempt::Exhausted
                            } else {
                                Attempt::Trying(n + 1)
                            }
                        }
                    };
                }
                Attempt::Succeeded(reply) => return reply,
                Attempt::Exhausted => {
                    tracing::error!(
                        persona = persona.as_str(),
                        attempts = self.config.max_attempts,
                        "generation budget exhausted, serving fallback reply"
                    );
                    return fallback_reply(persona);
                }
            }
        }
    }

    async fn attempt(&self, system: &str, messages: &[LlmMessage]) -> Result<TutorReply> {
        let request = LlmRequest {
            model: self.config.model.clone(),
            system: Some(system.to_string()),
            messages: messages.to_vec(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            json_output: true,
        };

        let response = tokio::time::timeout(self.config.attempt_timeout, self.provider.chat(request))
            .await
            .map_err(|_| {
                anyhow!(
                    "model call exceeded attempt deadline of {:?}",
                    self.config.attempt_timeout
                )
            })??;

        let candidate: serde_json::Value = serde_json::from_str(&response.text)
            .map_err(|e| anyhow!("model output is not valid JSON: {e}"))?;

        let reply = validate::validate(&candidate)?;
        Ok(reply)
    }
}

/// Fixed degraded-but-valid reply served when all attempts fail. Constant
/// per skill mode so a failed request still reads as a conversational turn.
pub fn fallback_reply(persona: Persona) -> TutorReply {
    match persona.skill_mode() {
        SkillMode::Beginner => TutorReply {
            tagalog: "Ay, pasensya na! I lost my train of thought for a moment. \
                      Can you say that one more time?"
                .into(),
            sabihin: Some("pa-SEN-sya na".into()),
            meaning: Some("\"Pasensya na\" means \"sorry\" or \"please bear with me\".".into()),
            correction: None,
            examples: None,
            note: None,
        },
        SkillMode::Heritage => TutorReply {
            tagalog: "Pasensya na, nalito ako sandali. Ulitin mo nga ang sinabi mo?".into(),
            sabihin: None,
            meaning: None,
            correction: None,
            examples: None,
            note: None,
        },
    }
}
