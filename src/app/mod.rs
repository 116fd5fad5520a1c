//! User-facing handlers. Each takes the session by reference, calls the
//! collaborators and turns their failures into the messages shown to the user.

mod errors;
pub mod interactive;
mod progress;
pub mod run;

pub use errors::AppError;

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::llm::GroqClient;
use crate::pipeline::{Extraction, Progress};
use crate::records::{self, ExtractionRecord};
use crate::search::SerpApiClient;
use crate::session::{InputMethod, Session};
use crate::sheets::auth::{ServiceAccountAuth, ServiceAccountKey};
use crate::sheets::write_back::write_back;
use crate::sheets::{self, SHEET_RANGE, SheetsApi, SheetsClient, UpdateSummary};
use crate::table::Table;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()
}

/// The three backends the tool drives.
pub struct App {
    search: SerpApiClient,
    llm: GroqClient,
    sheets: SheetsClient,
}

impl App {
    pub fn new(search: SerpApiClient, llm: GroqClient, sheets: SheetsClient) -> Self {
        Self { search, llm, sheets }
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let http = http_client()?;
        let key = ServiceAccountKey::from_file(&config.service_account_file)
            .map_err(AppError::Credentials)?;
        let auth = ServiceAccountAuth::new(http.clone(), key, config.scopes.clone());
        let llm = GroqClient::new(
            http.clone(),
            config.groq_api_key.clone(),
            config.groq_api_url.as_deref(),
            config.groq_model.as_deref(),
        );
        info!(model = llm.model(), scopes = config.scopes.len(), "clients configured");
        Ok(Self::new(
            SerpApiClient::new(http.clone(), config.serpapi_key.clone()),
            llm,
            SheetsClient::new(http, auth),
        ))
    }

    /// Parse an uploaded CSV and make it the session's input.
    pub fn load_csv<'s>(&self, session: &'s mut Session, path: &Path) -> Result<&'s Table, AppError> {
        session.select_method(InputMethod::Csv);
        session.select_file(path);
        let table = match Table::from_csv_path(path) {
            Ok(table) => table,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read CSV");
                session.unload_table();
                return Err(AppError::Csv(e));
            }
        };
        info!(path = %path.display(), rows = table.len(), "CSV loaded");
        Ok(session.load_table(table))
    }

    /// Fetch `Sheet1` of the spreadsheet behind a share URL.
    ///
    /// A read failure leaves the session without a table. An empty sheet
    /// loads as an empty table.
    pub async fn load_sheet<'s>(
        &self,
        session: &'s mut Session,
        url: &str,
    ) -> Result<&'s Table, AppError> {
        session.select_method(InputMethod::Sheet);
        let sheet_id = sheets::extract_sheet_id(url).ok_or(AppError::InvalidSheetUrl)?;
        session.select_sheet(sheet_id);

        let values = match self.sheets.get_values(sheet_id, SHEET_RANGE).await {
            Ok(values) => values,
            Err(e) => {
                error!(sheet_id, error = %e, "failed to read sheet");
                session.unload_table();
                return Err(AppError::SheetRead(e));
            }
        };
        let table = Table::from_values(values);
        info!(sheet_id, rows = table.len(), "sheet loaded");
        Ok(session.load_table(table))
    }

    /// Run the extraction over the loaded table and store the results.
    pub async fn extract<'s>(
        &self,
        session: &'s mut Session,
        column: &str,
        template: &str,
        on_progress: impl FnMut(Progress<'_>),
    ) -> Result<&'s [ExtractionRecord], AppError> {
        let (table, searches) = session.table_and_searches().ok_or(AppError::NoInput)?;
        if table.is_empty() {
            return Err(AppError::NoInput);
        }

        let outcome = Extraction::new(&self.search, &self.llm)
            .run(table, column, template, searches, on_progress)
            .await;

        match outcome {
            Ok(records) => {
                info!(
                    records = records.len(),
                    searches = session.search_count(),
                    "extraction completed"
                );
                session.finish_extraction(records);
                session.results().ok_or(AppError::NoResults)
            }
            Err(e) => {
                error!(error = %e, "extraction aborted");
                session.fail_extraction();
                Err(AppError::Extraction(e))
            }
        }
    }

    /// Write the results into the session's spreadsheet.
    pub async fn update_sheet(&self, session: &Session) -> Result<UpdateSummary, AppError> {
        if session.input_method() != Some(InputMethod::Sheet) {
            return Err(AppError::NotASheet);
        }
        let sheet_id = session.current_sheet_id().ok_or(AppError::NotASheet)?;
        let records = session.results().ok_or(AppError::NoResults)?;

        write_back(&self.sheets, sheet_id, records).await.map_err(|e| {
            error!(sheet_id, error = %e, "sheet update failed");
            AppError::SheetUpdate(e)
        })
    }
}

/// Raw results as quoted CSV.
pub fn export_extracted(session: &Session) -> Result<String, AppError> {
    let records = session.results().ok_or(AppError::NoResults)?;
    Ok(records::to_csv(records)?)
}

/// The loaded table with the `email` column filled from the results.
pub fn export_merged(session: &Session, column: &str) -> Result<String, AppError> {
    let records = session.results().ok_or(AppError::NoResults)?;
    let table = session.table().ok_or(AppError::NoInput)?;
    if table.column_index(column).is_none() {
        warn!(column, "entity column missing from table; merged emails will be empty");
    }
    Ok(records::table_to_csv(&records::merge(table, column, records))?)
}

pub fn save(path: &Path, contents: &str) -> Result<(), AppError> {
    std::fs::write(path, contents)?;
    info!(path = %path.display(), bytes = contents.len(), "file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::NOT_FOUND;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Backends {
        search: MockServer,
        llm: MockServer,
        sheets: MockServer,
    }

    impl Backends {
        async fn start() -> Self {
            Self {
                search: MockServer::start().await,
                llm: MockServer::start().await,
                sheets: MockServer::start().await,
            }
        }

        fn app(&self) -> App {
            let http = Client::new();
            App::new(
                SerpApiClient::with_base_url(http.clone(), &self.search.uri()),
                GroqClient::with_base_url(http.clone(), &self.llm.uri()),
                SheetsClient::with_base_url(http, &self.sheets.uri()),
            )
        }

        async fn serve_sheet(&self, values: serde_json::Value) {
            Mock::given(method("GET"))
                .and(path("/sheet123/values/Sheet1"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "values": values })),
                )
                .mount(&self.sheets)
                .await;
        }

        async fn serve_search(&self, query: &str, snippets: &[&str]) {
            let results: Vec<_> = snippets
                .iter()
                .map(|s| serde_json::json!({ "snippet": s }))
                .collect();
            Mock::given(method("GET"))
                .and(path("/search.json"))
                .and(query_param("q", query))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "organic_results": results
                })))
                .mount(&self.search)
                .await;
        }

        async fn serve_completion(&self, content: &str) {
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": content}}]
                })))
                .mount(&self.llm)
                .await;
        }
    }

    const SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/sheet123/edit#gid=0";

    #[tokio::test]
    async fn invalid_sheet_url_skips_fetch() {
        let backends = Backends::start().await;
        let mut session = Session::new();

        let err = backends
            .app()
            .load_sheet(&mut session, "https://example.com/nothing")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid Google Sheets URL"));
        assert!(backends.sheets.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sheet_read_failure_is_reported_without_table() {
        let backends = Backends::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&backends.sheets)
            .await;
        let mut session = Session::new();
        session.select_method(InputMethod::Sheet);
        session.load_table(Table::new(vec!["Company".into()], vec![]));

        let err = backends.app().load_sheet(&mut session, SHEET_URL).await.unwrap_err();

        assert!(err.to_string().starts_with("Error reading Google Sheet"), "got: {err}");
        assert!(session.table().is_none());
    }

    #[tokio::test]
    async fn sheet_extract_and_write_back() {
        let backends = Backends::start().await;
        backends
            .serve_sheet(serde_json::json!([["Company"], ["Acme"]]))
            .await;
        backends
            .serve_search("Get the email of Acme", &["Write to hello@acme.com"])
            .await;
        backends.serve_completion(" hello@acme.com\n").await;
        Mock::given(method("PUT"))
            .and(path("/sheet123/values/Sheet1%21A1%3AB2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "updatedRange": "Sheet1!A1:B2",
                "updatedCells": 4
            })))
            .expect(1)
            .mount(&backends.sheets)
            .await;

        let app = backends.app();
        let mut session = Session::new();
        app.load_sheet(&mut session, SHEET_URL).await.unwrap();

        let records = app
            .extract(&mut session, "Company", "Get the email of {company}", |_| {})
            .await
            .unwrap();
        assert_eq!(records, [ExtractionRecord::new("Acme", "hello@acme.com")]);
        assert_eq!(session.search_count(), 1);

        let summary = app.update_sheet(&session).await.unwrap();
        assert_eq!(summary.updated_cells, Some(4));
    }

    #[tokio::test]
    async fn extraction_failure_leaves_session_incomplete() {
        let backends = Backends::start().await;
        backends
            .serve_sheet(serde_json::json!([["Company"], ["Acme"], ["Globex"]]))
            .await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "Invalid API key."
            })))
            .mount(&backends.search)
            .await;

        let app = backends.app();
        let mut session = Session::new();
        app.load_sheet(&mut session, SHEET_URL).await.unwrap();

        let err = app
            .extract(&mut session, "Company", "{company}", |_| {})
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Error during extraction"), "got: {err}");
        assert!(!session.is_completed());
        assert!(session.results().is_none());
        assert_eq!(session.search_count(), 1);
    }

    #[tokio::test]
    async fn extract_without_input_is_rejected() {
        let backends = Backends::start().await;
        let mut session = Session::new();
        let err = backends
            .app()
            .extract(&mut session, "Company", "{company}", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoInput));
    }

    #[tokio::test]
    async fn update_sheet_requires_sheet_input() {
        let backends = Backends::start().await;
        let mut session = Session::new();
        session.select_method(InputMethod::Csv);
        session.finish_extraction(vec![ExtractionRecord::new("Acme", NOT_FOUND)]);

        let err = backends.app().update_sheet(&session).await.unwrap_err();
        assert!(matches!(err, AppError::NotASheet));
    }

    #[test]
    fn exports_require_completed_results() {
        let session = Session::new();
        assert!(matches!(export_extracted(&session), Err(AppError::NoResults)));
        assert!(matches!(export_merged(&session, "Company"), Err(AppError::NoResults)));
    }

    #[test]
    fn merged_export_joins_on_entity_column() {
        let mut session = Session::new();
        session.select_method(InputMethod::Csv);
        session.load_table(Table::new(
            vec!["Company".into()],
            vec![vec!["Acme".into()], vec!["Globex".into()]],
        ));
        session.finish_extraction(vec![ExtractionRecord::new("Acme", "a@x.com")]);

        let text = export_merged(&session, "Company").unwrap();
        assert_eq!(
            text,
            "\"Company\",\"email\"\n\"Acme\",\"a@x.com\"\n\"Globex\",\"\"\n"
        );
        assert_eq!(
            export_extracted(&session).unwrap(),
            "\"company\",\"email\"\n\"Acme\",\"a@x.com\"\n"
        );
    }
}
