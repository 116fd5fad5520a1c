//! Google Sheets: sheet-id parsing, service-account auth, values client and write-back.

pub mod auth;
mod client;
pub mod write_back;

pub use client::{SheetsApi, SheetsClient, UpdateSummary};

/// The single range the tool reads from and writes to.
pub const SHEET_RANGE: &str = "Sheet1";

/// Errors returned by spreadsheet operations.
#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("Spreadsheet not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0} (share the sheet with the service account)")]
    Forbidden(String),

    #[error("Sheets API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Invalid service account credentials: {0}")]
    Credentials(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Spreadsheet id from a share URL: the path segment after `/d/`.
pub fn extract_sheet_id(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("/d/")?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    let id = &rest[..end];
    (!id.is_empty()).then_some(id)
}

/// A1 column letter for a zero-based column index.
///
/// Only single letters are produced: indices past 25 map to the characters
/// after `Z` and will not address the intended column.
pub fn column_letter(index: usize) -> char {
    u32::try_from(index)
        .ok()
        .and_then(|i| char::from_u32(u32::from(b'A') + i))
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_share_url() {
        assert_eq!(
            extract_sheet_id(
                "https://docs.google.com/spreadsheets/d/1AbC-d_EF23/edit#gid=0"
            ),
            Some("1AbC-d_EF23")
        );
    }

    #[test]
    fn extracts_id_without_trailing_path() {
        assert_eq!(
            extract_sheet_id("https://docs.google.com/spreadsheets/d/abc123"),
            Some("abc123")
        );
    }

    #[test]
    fn rejects_url_without_id() {
        assert_eq!(extract_sheet_id("https://docs.google.com/spreadsheets/"), None);
        assert_eq!(extract_sheet_id("https://docs.google.com/spreadsheets/d/"), None);
        assert_eq!(extract_sheet_id("not a url"), None);
    }

    #[test]
    fn column_letters_are_single_ascii_offsets() {
        assert_eq!(column_letter(0), 'A');
        assert_eq!(column_letter(1), 'B');
        assert_eq!(column_letter(25), 'Z');
        assert_eq!(column_letter(26), '[');
    }
}
