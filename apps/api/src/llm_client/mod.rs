//! LLM Client — the single point of entry for chat-completion calls.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint (DashScope
//! compatible mode by default). Exactly one request per call: retry policy
//! belongs to whoever invoked the extraction, not to this layer.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod telemetry;

use telemetry::TelemetryConfig;

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
/// Low and fixed so the same utterance maps to the same labels.
pub const TEMPERATURE: f64 = 0.1;
const MAX_TOKENS: u32 = 512;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("No API key configured. Set DASHSCOPE_API_KEY and restart the service")]
    MissingCredential,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed completion response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Configuration problems need operator action; everything else is transport.
    pub fn is_configuration(&self) -> bool {
        matches!(self, LlmError::MissingCredential)
    }
}

/// A chat-completion capability: one system message, one user message, text back.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub telemetry: Option<TelemetryConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 60,
            telemetry: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// reqwest-backed [`ChatBackend`] for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError> {
        let api_key = self.api_key().ok_or(LlmError::MissingCredential)?;

        let request_body = ChatRequest {
            model,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let started = Instant::now();
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatResponse = serde_json::from_str(&body)?;
        let usage = completion.usage.unwrap_or_default();

        debug!(
            "LLM call succeeded: model={model}, prompt_tokens={}, completion_tokens={}",
            usage.prompt_tokens, usage.completion_tokens
        );
        if let Some(telemetry) = &self.config.telemetry {
            telemetry.record_call(model, started.elapsed(), usage);
        }

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> LlmClient {
        LlmClient::new(LlmConfig {
            base_url: format!("{}/v1/", server.uri()),
            api_key: api_key.map(String::from),
            timeout_secs: 1,
            telemetry: None,
        })
        .unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30}
        })
    }

    #[tokio::test]
    async fn test_complete_sends_two_roles_and_fixed_temperature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "qwen-plus",
                "temperature": 0.1,
                "messages": [
                    {"role": "system", "content": "SYSTEM"},
                    {"role": "user", "content": "我想去英国读硕士"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"country\": \"英国\"}")))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server, Some("test-key"))
            .complete("qwen-plus", "SYSTEM", "我想去英国读硕士")
            .await
            .unwrap();
        assert_eq!(text, "{\"country\": \"英国\"}");
    }

    #[tokio::test]
    async fn test_reply_text_is_returned_unmodified() {
        let server = MockServer::start().await;
        let reply = "  Sure! ```json\n{}\n```  \n";
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(reply)))
            .mount(&server)
            .await;

        let text = client_for(&server, Some("k"))
            .complete("deepseek-chat", "s", "u")
            .await
            .unwrap();
        assert_eq!(text, reply);
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
            .expect(0)
            .mount(&server)
            .await;

        for key in [None, Some("   ")] {
            let err = client_for(&server, key)
                .complete("qwen-plus", "s", "u")
                .await
                .unwrap_err();
            assert!(err.is_configuration());
        }
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"error": {"message": "upstream overloaded"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k"))
            .complete("qwen-plus", "s", "u")
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_keeps_raw_body_when_not_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("bad"))
            .complete("qwen-plus", "s", "u")
            .await
            .unwrap_err();
        assert!(!err.is_configuration());
        assert_eq!(err.to_string(), "API error (status 401): invalid api key");
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("{}"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k"))
            .complete("qwen-plus", "s", "u")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k"))
            .complete("qwen-plus", "s", "u")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[test]
    fn test_completions_url_tolerates_trailing_slash() {
        let client = LlmClient::new(LlmConfig {
            base_url: "http://localhost:9000/v1/".to_string(),
            ..LlmConfig::default()
        })
        .unwrap();
        assert_eq!(client.completions_url(), "http://localhost:9000/v1/chat/completions");
        assert!(!client.has_credential());
    }
}
