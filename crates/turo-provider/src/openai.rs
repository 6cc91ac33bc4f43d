use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{LlmMessage, LlmProvider, LlmRequest, LlmResponse};

/// Chat-completions client for any OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderErrorKind {
    RateLimit,
    ServerError,
    AuthError,
    InvalidRequest,
    Unknown,
}

impl ProviderErrorKind {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            429 => Self::RateLimit,
            401 | 403 => Self::AuthError,
            400 | 422 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::ServerError)
    }
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env(api_key_env: &str, api_base: impl Into<String>) -> Result<Self> {
        let api_key =
            std::env::var(api_key_env).map_err(|_| anyhow!("{api_key_env} is not set"))?;
        Ok(Self::new(api_key, api_base))
    }

    pub(crate) fn to_api_request(request: LlmRequest) -> ApiRequest {
        ApiRequest {
            model: request.model,
            messages: to_api_messages(request.system, request.messages),
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
            response_format: if request.json_output {
                Some(ApiResponseFormat {
                    format_type: "json_object".to_string(),
                })
            } else {
                None
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        let payload = Self::to_api_request(request);

        let resp = match self
            .client
            .post(url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(anyhow!(
                    "openai api error (timeout) [retryable]: request timed out after 30s"
                ));
            }
            Err(e) if e.is_connect() => {
                return Err(anyhow!("openai api error (connect) [retryable]: {e}"));
            }
            Err(e) => return Err(e.into()),
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await?;
            let parsed = serde_json::from_str::<ApiErrorEnvelope>(&text).ok();
            tracing::warn!(status = %status, "chat completion request failed");
            return Err(format_api_error(status, parsed));
        }

        let body: ApiResponse = resp.json().await?;
        to_llm_response(body)
    }
}

fn to_api_messages(system: Option<String>, messages: Vec<LlmMessage>) -> Vec<ApiMessage> {
    let mut result = Vec::new();

    if let Some(system_text) = system {
        result.push(ApiMessage {
            role: "system".to_string(),
            content: system_text,
        });
    }

    for message in messages {
        result.push(ApiMessage {
            role: message.role,
            content: message.content,
        });
    }

    result
}

fn to_llm_response(body: ApiResponse) -> Result<LlmResponse> {
    let choice = body
        .choices
        .first()
        .ok_or_else(|| anyhow!("openai api error: empty choices"))?;

    Ok(LlmResponse {
        text: choice.message.content.clone().unwrap_or_default(),
        input_tokens: body.usage.as_ref().map(|u| u.prompt_tokens),
        output_tokens: body.usage.as_ref().map(|u| u.completion_tokens),
        stop_reason: normalize_finish_reason(choice.finish_reason.clone()),
    })
}

fn normalize_finish_reason(reason: Option<String>) -> Option<String> {
    match reason.as_deref() {
        Some("stop") => Some("end_turn".to_string()),
        Some("length") => Some("max_tokens".to_string()),
        _ => reason,
    }
}

fn format_api_error(status: StatusCode, parsed: Option<ApiErrorEnvelope>) -> anyhow::Error {
    let kind = ProviderErrorKind::from_status(status);
    let retryable = if kind.is_retryable() {
        " [retryable]"
    } else {
        ""
    };
    if let Some(api_error) = parsed {
        anyhow!(
            "openai api error ({status}){retryable}: {} ({})",
            api_error.error.message,
            api_error.error.r#type
        )
    } else {
        anyhow!("openai api error ({status}){retryable}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ApiResponseFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiResponse {
    pub choices: Vec<ApiChoice>,
    #[serde(default)]
    pub usage: Option<ApiUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiChoice {
    pub message: ApiAssistantMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiAssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(rename = "type")]
    pub r#type: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_api_request_includes_system_as_first_message() {
        let req = LlmRequest::simple("gpt-4o-mini".into(), Some("be concise".into()), "hi".into());
        let api = OpenAiProvider::to_api_request(req);
        assert_eq!(api.messages[0].role, "system");
        assert_eq!(api.messages[0].content, "be concise");
        assert_eq!(api.messages[1].role, "user");
    }

    #[test]
    fn to_api_request_maps_json_output_to_response_format() {
        let mut req = LlmRequest::simple("gpt-4o-mini".into(), None, "hi".into());
        req.json_output = true;
        let api = OpenAiProvider::to_api_request(req);
        assert_eq!(api.response_format.unwrap().format_type, "json_object");
    }

    #[test]
    fn to_api_request_omits_response_format_for_free_text() {
        let req = LlmRequest::simple("gpt-4o-mini".into(), None, "hi".into());
        let api = OpenAiProvider::to_api_request(req);
        let json = serde_json::to_value(api).unwrap();
        assert!(json.get("response_format").is_none());
        assert_eq!(json["temperature"], 0.7);
    }

    #[test]
    fn api_response_deserialization_text_only() {
        let raw = serde_json::json!({
            "choices": [{
                "message": {"content": "hello"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        });
        let parsed: ApiResponse = serde_json::from_value(raw).unwrap();
        let resp = to_llm_response(parsed).unwrap();
        assert_eq!(resp.text, "hello");
        assert_eq!(resp.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(resp.input_tokens, Some(12));
    }

    #[test]
    fn empty_choices_is_an_error() {
        let parsed: ApiResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(to_llm_response(parsed).is_err());
    }

    #[test]
    fn error_kind_covers_every_retryability_class() {
        assert_eq!(
            ProviderErrorKind::from_status(StatusCode::TOO_MANY_REQUESTS),
            ProviderErrorKind::RateLimit
        );
        assert_eq!(
            ProviderErrorKind::from_status(StatusCode::BAD_GATEWAY),
            ProviderErrorKind::ServerError
        );
        assert!(ProviderErrorKind::RateLimit.is_retryable());
        assert!(ProviderErrorKind::ServerError.is_retryable());
        assert!(!ProviderErrorKind::AuthError.is_retryable());
        assert!(!ProviderErrorKind::InvalidRequest.is_retryable());
        assert!(!ProviderErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn format_api_error_retryable_for_429() {
        let err = format_api_error(
            StatusCode::TOO_MANY_REQUESTS,
            Some(ApiErrorEnvelope {
                error: ApiErrorBody {
                    r#type: "rate_limit_error".into(),
                    message: "too many requests".into(),
                },
            }),
        );
        assert!(err.to_string().contains("[retryable]"));
    }

    #[test]
    fn format_api_error_not_retryable_for_401() {
        let err = format_api_error(
            StatusCode::UNAUTHORIZED,
            Some(ApiErrorEnvelope {
                error: ApiErrorBody {
                    r#type: "invalid_api_key".into(),
                    message: "bad key".into(),
                },
            }),
        );
        assert!(!err.to_string().contains("[retryable]"));
    }

    #[test]
    fn finish_reason_normalization() {
        assert_eq!(
            normalize_finish_reason(Some("stop".into())).as_deref(),
            Some("end_turn")
        );
        assert_eq!(
            normalize_finish_reason(Some("length".into())).as_deref(),
            Some("max_tokens")
        );
        assert_eq!(normalize_finish_reason(None), None);
    }

    #[test]
    fn from_env_missing_key_returns_error() {
        std::env::remove_var("TURO_KEY_FOR_TEST");
        let result = OpenAiProvider::from_env("TURO_KEY_FOR_TEST", "https://api.openai.com/v1");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("TURO_KEY_FOR_TEST"));
    }
}
