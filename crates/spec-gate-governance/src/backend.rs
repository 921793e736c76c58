// crates/spec-gate-governance/src/backend.rs
// ============================================================================
// Module: Chat Completions Backend
// Description: OpenAI-compatible text generation over HTTP.
// Purpose: Reach a hosted model through an explicit, injected client.
// Dependencies: spec-gate-core, reqwest, serde
// ============================================================================

//! ## Overview
//! [`ChatCompletionsGenerator`] posts role-tagged messages to
//! `{base_url}/chat/completions` and returns the first choice's content.
//! All connection details come from [`ChatCompletionsConfig`]; nothing is read
//! from the process environment here. Response bodies are read under a hard
//! byte limit, and error bodies are never echoed back to callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::Response;
use reqwest::Url;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use spec_gate_core::GenerationError;
use spec_gate_core::GenerationRequest;
use spec_gate_core::TextGenerator;

use crate::engine::GovernanceError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Connection settings for a chat completions backend.
///
/// # Invariants
/// - `allow_http = false` rejects cleartext `http://` base URLs.
/// - `max_response_bytes` bounds every response body.
/// - `Debug` output never includes the API key.
#[derive(Clone)]
pub struct ChatCompletionsConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub request_timeout: Duration,
    /// Maximum accepted response body size.
    pub max_response_bytes: usize,
    /// User agent header value.
    pub user_agent: String,
    /// Permit cleartext HTTP base URLs.
    pub allow_http: bool,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(120),
            max_response_bytes: 1024 * 1024,
            user_agent: concat!("spec-gate/", env!("CARGO_PKG_VERSION")).to_string(),
            allow_http: false,
        }
    }
}

impl fmt::Debug for ChatCompletionsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .field("user_agent", &self.user_agent)
            .field("allow_http", &self.allow_http)
            .finish()
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Chat completions request body.
#[derive(Serialize)]
struct ChatRequest<'a> {
    /// Model identifier.
    model: &'a str,
    /// Conversation messages.
    messages: [ChatMessage<'a>; 2],
    /// Sampling temperature.
    temperature: f32,
}

/// One role-tagged message.
#[derive(Serialize)]
struct ChatMessage<'a> {
    /// `system` or `user`.
    role: &'static str,
    /// Message text.
    content: &'a str,
}

/// Chat completions response body.
#[derive(Deserialize)]
struct ChatResponse {
    /// Generated alternatives.
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// One generated alternative.
#[derive(Deserialize)]
struct ChatChoice {
    /// Assistant message.
    message: ChatChoiceMessage,
}

/// Assistant message payload.
#[derive(Deserialize)]
struct ChatChoiceMessage {
    /// Generated text, absent for tool-only replies.
    #[serde(default)]
    content: Option<String>,
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// OpenAI-compatible chat completions backend.
///
/// # Invariants
/// - The endpoint URL is validated at construction time.
pub struct ChatCompletionsGenerator {
    /// Fully resolved `/chat/completions` endpoint.
    endpoint: Url,
    /// Model identifier.
    model: String,
    /// Optional bearer token.
    api_key: Option<String>,
    /// Body size limit.
    max_response_bytes: usize,
    /// HTTP client configured with timeouts.
    client: Client,
}

impl ChatCompletionsGenerator {
    /// Builds a generator from connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::InvalidConfig`] when the URL, model, or
    /// limits are unusable or the HTTP client cannot be built.
    pub fn new(config: ChatCompletionsConfig) -> Result<Self, GovernanceError> {
        if config.model.trim().is_empty() {
            return Err(GovernanceError::InvalidConfig("backend model must be set".to_string()));
        }
        if config.max_response_bytes == 0 {
            return Err(GovernanceError::InvalidConfig(
                "max_response_bytes must be greater than zero".to_string(),
            ));
        }
        let endpoint = completions_endpoint(&config.base_url, config.allow_http)?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .redirect(Policy::none())
            .build()
            .map_err(|err| GovernanceError::InvalidConfig(err.to_string()))?;
        Ok(Self {
            endpoint,
            model: config.model,
            api_key: config.api_key,
            max_response_bytes: config.max_response_bytes,
            client,
        })
    }

    /// Returns the resolved endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
        };
        let mut builder = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let mut response =
            builder.send().await.map_err(|err| GenerationError::Unavailable(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }
        let bytes = read_response_limited(&mut response, self.max_response_bytes).await?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|err| GenerationError::Malformed(err.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                GenerationError::Malformed("missing choices[0].message.content".to_string())
            })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates the base URL and appends the completions path.
fn completions_endpoint(base_url: &str, allow_http: bool) -> Result<Url, GovernanceError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let endpoint = Url::parse(&format!("{trimmed}/chat/completions"))
        .map_err(|err| GovernanceError::InvalidConfig(format!("invalid backend url: {err}")))?;
    match endpoint.scheme() {
        "https" => {}
        "http" if allow_http => {}
        _ => {
            return Err(GovernanceError::InvalidConfig(
                "backend url must use https (set allow_http for http)".to_string(),
            ));
        }
    }
    if !endpoint.username().is_empty() || endpoint.password().is_some() {
        return Err(GovernanceError::InvalidConfig(
            "backend url must not embed credentials".to_string(),
        ));
    }
    if endpoint.host_str().is_none() {
        return Err(GovernanceError::InvalidConfig("backend url host required".to_string()));
    }
    Ok(endpoint)
}

/// Reads the response body while enforcing a byte limit.
async fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, GenerationError> {
    if let Some(expected) = response.content_length()
        && !usize::try_from(expected).is_ok_and(|expected| expected <= max_bytes)
    {
        return Err(GenerationError::Malformed("response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| GenerationError::Unavailable(err.to_string()))?
    {
        if buf.len().saturating_add(chunk.len()) > max_bytes {
            return Err(GenerationError::Malformed("response exceeds size limit".to_string()));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
