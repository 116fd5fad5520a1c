use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organic_results: Vec<OrganicResult>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrganicResult {
    pub snippet: Option<String>,
}

impl SearchResponse {
    /// Snippets in result order; results without one are skipped.
    pub fn into_snippets(self) -> Vec<String> {
        self.organic_results
            .into_iter()
            .filter_map(|r| r.snippet)
            .collect()
    }
}
