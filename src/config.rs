use std::env;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("SCOPES is malformed: {0}")]
    Scopes(String),
}

/// Secret that never shows up in `Debug` output or logs.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Process configuration, read once at startup.
///
/// Environment variables (a `.env` file in the working directory is loaded first):
/// - `SERPAPI_KEY`: search backend key
/// - `GROQ_API_KEY`: language-model backend key
/// - `GROQ_API_URL`: optional OpenAI-compatible base URL
/// - `GROQ_MODEL`: optional model override
/// - `SERVICE_ACCOUNT_FILE`: Google service-account JSON key
/// - `SCOPES`: OAuth scopes, e.g. `['https://www.googleapis.com/auth/spreadsheets']`
#[derive(Debug, Clone)]
pub struct Config {
    pub serpapi_key: ApiKey,
    pub groq_api_key: ApiKey,
    pub groq_api_url: Option<String>,
    pub groq_model: Option<String>,
    pub service_account_file: PathBuf,
    pub scopes: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            serpapi_key: ApiKey::new(require("SERPAPI_KEY")?),
            groq_api_key: ApiKey::new(require("GROQ_API_KEY")?),
            groq_api_url: get("GROQ_API_URL"),
            groq_model: get("GROQ_MODEL"),
            service_account_file: PathBuf::from(require("SERVICE_ACCOUNT_FILE")?),
            scopes: parse_scopes(&require("SCOPES")?)?,
        })
    }
}

/// Parse a list literal such as `['a', 'b']`; bare `a, b` is accepted too.
pub fn parse_scopes(raw: &str) -> Result<Vec<String>, ConfigError> {
    let inner = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');

    let scopes: Vec<String> = inner
        .split(',')
        .map(|s| s.trim().trim_matches(['\'', '"']).trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if scopes.is_empty() {
        return Err(ConfigError::Scopes(format!("no scopes in '{raw}'")));
    }
    if let Some(bad) = scopes.iter().find(|s| url::Url::parse(s).is_err()) {
        return Err(ConfigError::Scopes(format!("'{bad}' is not a scope URL")));
    }
    Ok(scopes)
}
