//! Per-row extraction: search, join snippets, ask the model, record the answer.
//!
//! Rows run strictly one after another. The first failing request aborts
//! the whole run; there is no per-row recovery.

use tracing::{debug, info};

use crate::llm::{CompletionClient, LlmError};
use crate::records::{ExtractionRecord, NOT_FOUND};
use crate::search::{SearchError, SnippetSearch};
use crate::table::Table;

/// Placeholder substituted with the entity value in query templates.
pub const ENTITY_PLACEHOLDER: &str = "{company}";

pub const DEFAULT_QUERY: &str = "Get the email of {company}";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("column '{0}' not found in input")]
    UnknownColumn(String),

    #[error("search failed for '{entity}': {source}")]
    Search {
        entity: String,
        #[source]
        source: SearchError,
    },

    #[error("extraction failed for '{entity}': {source}")]
    Extract {
        entity: String,
        #[source]
        source: LlmError,
    },
}

/// Progress after (or, with `completed < total`, before) a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress<'a> {
    pub entity: &'a str,
    pub completed: usize,
    pub total: usize,
}

pub fn instantiate_query(template: &str, entity: &str) -> String {
    template.replace(ENTITY_PLACEHOLDER, entity)
}

/// Fixed instruction constraining the model to a bare list of addresses or the sentinel.
pub fn extraction_instruction(entity: &str) -> String {
    format!(
        "Extract the email address for {entity}. Note: the response should only contain \
         email addresses separated with commas and strictly there should be no explanation \
         like `Here is the extracted email address`. The response should be just the relevant \
         email address. If you failed to extract even a single email Id, then the response \
         should be `{NOT_FOUND}`"
    )
}

pub fn build_prompt(entity: &str, snippets: &[String]) -> String {
    format!("{}\n\n{}", extraction_instruction(entity), snippets.join("\n"))
}

pub struct Extraction<'a, S, L> {
    search: &'a S,
    llm: &'a L,
}

impl<'a, S: SnippetSearch, L: CompletionClient> Extraction<'a, S, L> {
    pub fn new(search: &'a S, llm: &'a L) -> Self {
        Self { search, llm }
    }

    /// Produce one record per row of `table`, in row order.
    ///
    /// `searches` counts every search request issued, including those of an
    /// aborted run. `on_progress` sees each row before (`completed = i`) and
    /// after (`completed = i + 1`) it is processed.
    pub async fn run(
        &self,
        table: &Table,
        column: &str,
        template: &str,
        searches: &mut u64,
        mut on_progress: impl FnMut(Progress<'_>),
    ) -> Result<Vec<ExtractionRecord>, PipelineError> {
        let entities = table
            .column_values(column)
            .ok_or_else(|| PipelineError::UnknownColumn(column.to_string()))?;
        let total = entities.len();
        let mut records = Vec::with_capacity(total);

        for (i, entity) in entities.into_iter().enumerate() {
            on_progress(Progress {
                entity,
                completed: i,
                total,
            });

            let query = instantiate_query(template, entity);
            let snippets = self.search.snippets(&query).await;
            *searches += 1;
            debug!(search_count = *searches, "search call issued");
            let snippets = snippets.map_err(|source| PipelineError::Search {
                entity: entity.to_string(),
                source,
            })?;

            let value = self
                .llm
                .complete(&build_prompt(entity, &snippets))
                .await
                .map_err(|source| PipelineError::Extract {
                    entity: entity.to_string(),
                    source,
                })?;

            let value = value.trim();
            info!(entity, value, "extracted");
            records.push(ExtractionRecord::new(entity, value));

            on_progress(Progress {
                entity,
                completed: i + 1,
                total,
            });
        }

        Ok(records)
    }
}
