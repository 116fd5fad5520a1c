use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::SheetsError;
use super::auth::ServiceAccountAuth;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Characters left as-is in a spreadsheet id or A1 range path segment.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, SEGMENT_ENCODE_SET).to_string()
}

/// Values read and written through a spreadsheet backend.
/// Implemented by `SheetsClient` for production; mock implementations used in tests.
pub trait SheetsApi {
    /// Cells of `range`, row-major. An empty sheet yields no rows.
    async fn get_values(
        &self,
        sheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Overwrite `range` with `values` as raw (unparsed) input.
    async fn update_values(
        &self,
        sheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> Result<UpdateSummary, SheetsError>;
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
struct ValueRangeBody<'a> {
    values: &'a [Vec<String>],
}

/// Response of a values update.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub updated_range: Option<String>,
    pub updated_rows: Option<u64>,
    pub updated_columns: Option<u64>,
    pub updated_cells: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Clone)]
enum Credentials {
    ServiceAccount(ServiceAccountAuth),
    #[cfg(test)]
    Static(String),
}

/// Google Sheets v4 values client.
#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    credentials: Credentials,
    base_url: String,
}

impl SheetsClient {
    pub fn new(http: Client, auth: ServiceAccountAuth) -> Self {
        Self {
            http,
            credentials: Credentials::ServiceAccount(auth),
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            credentials: Credentials::Static("test-token".to_string()),
            base_url: base_url.to_string(),
        }
    }

    async fn token(&self) -> Result<String, SheetsError> {
        match &self.credentials {
            Credentials::ServiceAccount(auth) => auth.access_token().await,
            #[cfg(test)]
            Credentials::Static(token) => Ok(token.clone()),
        }
    }

    fn values_url(&self, sheet_id: &str, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            self.base_url,
            encode_segment(sheet_id),
            encode_segment(range)
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| text.chars().take(200).collect());
        warn!(status = %status, "Sheets API error");
        Err(match status.as_u16() {
            404 => SheetsError::NotFound(message),
            403 => SheetsError::Forbidden(message),
            code => SheetsError::Api { code, message },
        })
    }
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl SheetsApi for SheetsClient {
    async fn get_values(
        &self,
        sheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let response = self
            .http
            .get(self.values_url(sheet_id, range))
            .bearer_auth(self.token().await?)
            .header("User-Agent", crate::USER_AGENT)
            .send()
            .await?;

        let body: ValueRange = Self::check(response).await?.json().await?;
        debug!(sheet_id, range, rows = body.values.len(), "sheet values read");
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn update_values(
        &self,
        sheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> Result<UpdateSummary, SheetsError> {
        let url = format!("{}?valueInputOption=RAW", self.values_url(sheet_id, range));
        let response = self
            .http
            .put(url)
            .bearer_auth(self.token().await?)
            .header("User-Agent", crate::USER_AGENT)
            .json(&ValueRangeBody { values })
            .send()
            .await?;

        let summary: UpdateSummary = Self::check(response).await?.json().await?;
        debug!(sheet_id, range, cells = ?summary.updated_cells, "sheet values written");
        Ok(summary)
    }
}
