use crate::pipeline::PipelineError;
use crate::sheets::SheetsError;
use crate::table::TableError;

/// Failures surfaced to the user. The display text is the message shown.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Error reading CSV file: {0}")]
    Csv(#[source] TableError),

    #[error("Invalid Google Sheets URL. Please check the URL format.")]
    InvalidSheetUrl,

    #[error("Error reading Google Sheet: {0}")]
    SheetRead(#[source] SheetsError),

    #[error("No input data loaded")]
    NoInput,

    #[error("Error during extraction: {0}")]
    Extraction(#[source] PipelineError),

    #[error("No extraction results for the current input")]
    NoResults,

    #[error("Results can only be written back when the input is a Google Sheet")]
    NotASheet,

    #[error("Error updating Google Sheet: {0}")]
    SheetUpdate(#[source] SheetsError),

    #[error("Error loading service account: {0}")]
    Credentials(#[source] SheetsError),

    #[error("Error writing CSV: {0}")]
    Export(#[from] csv::Error),

    #[error("Error saving file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error creating HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Terminal prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

impl AppError {
    /// Failures after which the session can carry on with another action.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            AppError::Credentials(_) | AppError::Http(_) | AppError::Prompt(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failed_step() {
        let err = AppError::SheetUpdate(SheetsError::Forbidden("denied".into()));
        assert!(err.to_string().starts_with("Error updating Google Sheet: Access denied"));

        let err = AppError::Extraction(PipelineError::UnknownColumn("Name".into()));
        assert_eq!(
            err.to_string(),
            "Error during extraction: column 'Name' not found in input"
        );
    }

    #[test]
    fn startup_failures_are_not_recoverable() {
        assert!(!AppError::Credentials(SheetsError::Credentials("x".into())).is_recoverable());
        assert!(AppError::InvalidSheetUrl.is_recoverable());
        assert!(AppError::NoResults.is_recoverable());
    }
}
