//! Core `CompletionBackend` trait and `ApiBackend` implementation.
//!
//! `ApiBackend` calls any OpenAI-compatible `/v1/chat/completions` endpoint
//! (OpenAI, Ollama in OpenAI mode, Groq, LM Studio, vLLM, ...).
//! All connection details come from [`LlmConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::assistant::Turn;
use crate::config::LlmConfig;

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Errors that can occur during a completion call.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend is throttling requests (HTTP 429).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Any other non-success HTTP status.
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("completion request timed out")]
    Timeout,

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse completion response: {0}")]
    Parse(String),

    /// The backend returned a response with no usable text content.
    #[error("backend returned an empty response")]
    EmptyResponse,
}

impl BackendError {
    /// `true` for the throttling class that the engine retries with backoff.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BackendError::RateLimited(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// CompletionRequest
// ---------------------------------------------------------------------------

/// One completion call: system instruction followed by the transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Turn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

// ---------------------------------------------------------------------------
// CompletionBackend trait
// ---------------------------------------------------------------------------

/// Async trait for text-completion services.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn CompletionBackend>`).
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Return the assistant's reply text for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;
}

// ---------------------------------------------------------------------------
// ApiBackend
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// The API key is resolved once at construction from `config.api_key` or the
/// `OPENAI_API_KEY` environment variable.
pub struct ApiBackend {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: Option<String>,
}

impl ApiBackend {
    /// Build an `ApiBackend` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`; a default client is used if the builder fails.
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: config.resolved_api_key(),
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CompletionBackend for ApiBackend {
    /// The `Authorization: Bearer` header is attached only when a non-empty
    /// key is configured, so local providers work unauthenticated.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: &request.system,
        });
        messages.extend(request.messages.iter().map(|turn| WireMessage {
            role: match turn.role {
                crate::assistant::Role::User => "user",
                crate::assistant::Role::Assistant => "assistant",
            },
            content: &turn.content,
        }));

        let body = WireRequest {
            model: &self.config.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = self.api_key.as_deref() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        log::debug!("completion response status {status}");

        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::RateLimited(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        let reply = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(BackendError::EmptyResponse)?
            .trim()
            .to_string();

        if reply.is_empty() {
            return Err(BackendError::EmptyResponse);
        }

        Ok(reply)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
