use reqwest::Client;
use tracing::{debug, warn};

use super::types::{ChatRequest, ChatResponse, ErrorResponse, Message};
use crate::config::ApiKey;

const API_BASE: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama3-8b-8192";

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion API rate limit exceeded")]
    RateLimited,

    #[error("completion API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("completion returned no choices")]
    EmptyResponse,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Single-turn text completion.
/// Implemented by `GroqClient` for production; mock implementations used in tests.
pub trait CompletionClient {
    /// Send one user message and return the reply trimmed of surrounding whitespace.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Clone)]
pub struct GroqClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl GroqClient {
    pub fn new(http: Client, api_key: ApiKey, base_url: Option<&str>, model: Option<&str>) -> Self {
        Self {
            http,
            api_key,
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            base_url: base_url
                .unwrap_or(API_BASE)
                .trim_end_matches('/')
                .to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self::new(http, ApiKey::new("test-key"), Some(base_url), None)
    }
}

impl CompletionClient for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message::user(prompt)],
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("completion API rate limited");
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| format!("HTTP {status}: {}", text.chars().take(200).collect::<String>()));
            warn!(status = %status, "completion API error");
            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?
            .message
            .content
            .unwrap_or_default();

        debug!(model = %self.model, chars = content.len(), "completion received");
        Ok(content.trim().to_string())
    }
}
