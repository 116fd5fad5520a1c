//! State for one interactive session.
//!
//! Results are tied to the input they were extracted from: any change of
//! input identity drops them before anything else can read them.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::records::ExtractionRecord;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMethod {
    Csv,
    Sheet,
}

impl InputMethod {
    pub const ALL: [InputMethod; 2] = [InputMethod::Csv, InputMethod::Sheet];

    pub fn label(self) -> &'static str {
        match self {
            InputMethod::Csv => "Upload CSV",
            InputMethod::Sheet => "Google Sheets URL",
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    input_method: Option<InputMethod>,
    current_file: Option<PathBuf>,
    current_sheet_id: Option<String>,
    table: Option<Table>,
    extraction_completed: bool,
    extracted: Option<Vec<ExtractionRecord>>,
    search_count: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn discard_results(&mut self) {
        self.extraction_completed = false;
        self.extracted = None;
    }

    /// Switching method drops the loaded table and any results.
    pub fn select_method(&mut self, method: InputMethod) {
        if self.input_method != Some(method) {
            debug!(?method, "input method changed");
            self.input_method = Some(method);
            self.current_file = None;
            self.current_sheet_id = None;
            self.table = None;
            self.discard_results();
        }
    }

    pub fn select_sheet(&mut self, sheet_id: &str) {
        if self.current_sheet_id.as_deref() != Some(sheet_id) {
            debug!(sheet_id, "sheet changed");
            self.current_sheet_id = Some(sheet_id.to_string());
            self.discard_results();
        }
    }

    pub fn select_file(&mut self, path: &Path) {
        if self.current_file.as_deref() != Some(path) {
            debug!(path = %path.display(), "input file changed");
            self.current_file = Some(path.to_path_buf());
            self.discard_results();
        }
    }

    pub fn load_table(&mut self, table: Table) -> &Table {
        self.table.insert(table)
    }

    /// Forget the loaded table after a failed load.
    pub fn unload_table(&mut self) {
        self.table = None;
        self.discard_results();
    }

    /// The loaded table alongside the search counter, for an extraction run.
    pub fn table_and_searches(&mut self) -> Option<(&Table, &mut u64)> {
        let table = self.table.as_ref()?;
        Some((table, &mut self.search_count))
    }

    pub fn finish_extraction(&mut self, records: Vec<ExtractionRecord>) {
        self.extracted = Some(records);
        self.extraction_completed = true;
    }

    pub fn fail_extraction(&mut self) {
        self.extraction_completed = false;
    }

    pub fn input_method(&self) -> Option<InputMethod> {
        self.input_method
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn current_sheet_id(&self) -> Option<&str> {
        self.current_sheet_id.as_deref()
    }

    pub fn is_completed(&self) -> bool {
        self.extraction_completed
    }

    /// Results of the last completed extraction for the current input.
    pub fn results(&self) -> Option<&[ExtractionRecord]> {
        if self.extraction_completed {
            self.extracted.as_deref().filter(|r| !r.is_empty())
        } else {
            None
        }
    }

    pub fn search_count(&self) -> u64 {
        self.search_count
    }
}
