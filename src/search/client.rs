use reqwest::Client;
use tracing::{debug, warn};

use super::types::SearchResponse;
use crate::config::ApiKey;

const API_BASE: &str = "https://serpapi.com";
const ENGINE: &str = "google";

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search API rate limit exceeded")]
    RateLimited,

    #[error("search API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("invalid search URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Web search reduced to the ordered snippets of its results.
/// Implemented by `SerpApiClient` for production; mock implementations used in tests.
pub trait SnippetSearch {
    async fn snippets(&self, query: &str) -> Result<Vec<String>, SearchError>;
}

#[derive(Clone)]
pub struct SerpApiClient {
    http: Client,
    api_key: ApiKey,
    base_url: String,
}

impl SerpApiClient {
    pub fn new(http: Client, api_key: ApiKey) -> Self {
        Self {
            http,
            api_key,
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey::new("test-key"),
            base_url: base_url.to_string(),
        }
    }
}

impl SnippetSearch for SerpApiClient {
    async fn snippets(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let url = url::Url::parse_with_params(
            &format!("{}/search.json", self.base_url),
            [
                ("engine", ENGINE),
                ("q", query),
                ("api_key", self.api_key.expose()),
            ],
        )?;

        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("search API rate limited");
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<SearchResponse>(&text)
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| text.chars().take(200).collect());
            warn!(status = %status, "search API error");
            return Err(SearchError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response.json().await?;
        if let Some(note) = &body.error {
            // A successful search with nothing to show carries its reason here.
            debug!(%note, "search returned no results");
        }

        let snippets = body.into_snippets();
        debug!(query, snippets = snippets.len(), "search complete");
        Ok(snippets)
    }
}
