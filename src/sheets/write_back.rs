//! Write extraction results back into the source spreadsheet.
//!
//! Sheet rows are matched on their first cell. A sheet without an `email`
//! header (any case) gets a new `Email` column; otherwise only that column is
//! rewritten and rows without a result keep their old value.

use tracing::{info, warn};

use super::{SHEET_RANGE, SheetsApi, SheetsError, UpdateSummary, column_letter};
use crate::records::{ExtractionRecord, NOT_FOUND, lookup};

const NEW_HEADERS: [&str; 2] = ["Company", "Email"];

/// What to write and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    pub range: String,
    pub values: Vec<Vec<String>>,
    pub kind: PlanKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// The sheet was empty; a two-column table is written from `A1`.
    Fresh,
    /// An `Email` column was appended and the whole table rewritten.
    AppendColumn { column: usize },
    /// The existing email column at this index was rewritten.
    OverwriteColumn { column: usize },
}

fn entity_of(row: &[String]) -> &str {
    row.first().map(String::as_str).unwrap_or("")
}

/// Decide the update for a sheet currently holding `current` (header row first).
pub fn plan(current: &[Vec<String>], records: &[ExtractionRecord]) -> WritePlan {
    let Some((headers, rows)) = current.split_first() else {
        let values = std::iter::once(NEW_HEADERS.map(String::from).to_vec())
            .chain(records.iter().map(|r| vec![r.entity.clone(), r.value.clone()]))
            .collect();
        return WritePlan {
            range: format!("{SHEET_RANGE}!A1"),
            values,
            kind: PlanKind::Fresh,
        };
    };

    let map = lookup(records);
    let email_col = headers.iter().position(|h| h.eq_ignore_ascii_case("email"));

    match email_col {
        None => {
            let column = headers.len();
            let letter = column_letter(column);

            let mut header_row = headers.clone();
            header_row.push(NEW_HEADERS[1].to_string());
            let mut values = vec![header_row];

            for row in rows {
                let value = map.get(entity_of(row)).copied().unwrap_or(NOT_FOUND);
                let mut row = row.clone();
                if row.len() < column {
                    row.resize(column, String::new());
                }
                row.push(value.to_string());
                values.push(row);
            }

            WritePlan {
                range: format!("{SHEET_RANGE}!A1:{letter}{}", values.len()),
                values,
                kind: PlanKind::AppendColumn { column },
            }
        }
        Some(column) => {
            let letter = column_letter(column);
            let values = rows
                .iter()
                .map(|row| {
                    let value = map
                        .get(entity_of(row))
                        .copied()
                        .or_else(|| row.get(column).map(String::as_str))
                        .unwrap_or("");
                    vec![value.to_string()]
                })
                .collect();

            WritePlan {
                range: format!("{SHEET_RANGE}!{letter}2:{letter}{}", current.len()),
                values,
                kind: PlanKind::OverwriteColumn { column },
            }
        }
    }
}

/// Fetch the sheet, plan the update and write it. Nothing is rolled back if
/// the write fails after a successful read.
pub async fn write_back(
    api: &impl SheetsApi,
    sheet_id: &str,
    records: &[ExtractionRecord],
) -> Result<UpdateSummary, SheetsError> {
    let current = api.get_values(sheet_id, SHEET_RANGE).await?;
    let plan = plan(&current, records);

    if let PlanKind::AppendColumn { column } | PlanKind::OverwriteColumn { column } = plan.kind
        && column >= 26
    {
        warn!(column, range = %plan.range, "column beyond Z cannot be addressed with a single letter");
    }

    if plan.values.is_empty() {
        info!(sheet_id, "sheet has no data rows; nothing to write");
        return Ok(UpdateSummary::default());
    }

    let summary = api.update_values(sheet_id, &plan.range, &plan.values).await?;
    info!(
        sheet_id,
        range = %plan.range,
        kind = ?plan.kind,
        cells = ?summary.updated_cells,
        "sheet updated"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_sheet_gets_fresh_table() {
        let records = vec![
            ExtractionRecord::new("Acme", "a@x.com"),
            ExtractionRecord::new("Globex", NOT_FOUND),
        ];
        let plan = plan(&[], &records);

        assert_eq!(plan.kind, PlanKind::Fresh);
        assert_eq!(plan.range, "Sheet1!A1");
        assert_eq!(
            plan.values,
            vec![
                strings(&["Company", "Email"]),
                strings(&["Acme", "a@x.com"]),
                strings(&["Globex", NOT_FOUND]),
            ]
        );
    }

    #[test]
    fn appends_email_column_when_absent() {
        let current = vec![strings(&["Company"]), strings(&["Acme"])];
        let records = vec![ExtractionRecord::new("Acme", "a@x.com")];
        let plan = plan(&current, &records);

        assert_eq!(plan.kind, PlanKind::AppendColumn { column: 1 });
        assert_eq!(plan.range, "Sheet1!A1:B2");
        assert_eq!(
            plan.values,
            vec![strings(&["Company", "Email"]), strings(&["Acme", "a@x.com"])]
        );
    }

    #[test]
    fn appended_column_falls_back_to_sentinel() {
        let current = vec![
            strings(&["Company", "City"]),
            strings(&["Acme", "Paris"]),
            strings(&["Unknown", "Rome"]),
        ];
        let plan = plan(&current, &[ExtractionRecord::new("Acme", "a@x.com")]);

        assert_eq!(plan.range, "Sheet1!A1:C3");
        assert_eq!(plan.values[2], strings(&["Unknown", "Rome", NOT_FOUND]));
    }

    #[test]
    fn short_rows_are_padded_before_appending() {
        let current = vec![
            strings(&["Company", "City", "Phone"]),
            strings(&["Acme"]),
        ];
        let plan = plan(&current, &[ExtractionRecord::new("Acme", "a@x.com")]);

        assert_eq!(plan.values[1], strings(&["Acme", "", "", "a@x.com"]));
    }

    #[test]
    fn existing_email_column_matched_case_insensitively() {
        let current = vec![
            strings(&["Company", "EMAIL"]),
            strings(&["Acme", "old@x.com"]),
            strings(&["Globex", "g-old@x.com"]),
        ];
        let records = vec![ExtractionRecord::new("Globex", "g@x.com")];
        let plan = plan(&current, &records);

        assert_eq!(plan.kind, PlanKind::OverwriteColumn { column: 1 });
        assert_eq!(plan.range, "Sheet1!B2:B3");
        assert_eq!(plan.values, vec![strings(&["old@x.com"]), strings(&["g@x.com"])]);
    }

    #[test]
    fn unmatched_row_with_short_cells_keeps_empty_value() {
        let current = vec![strings(&["Email", "Company"]), strings(&[])];
        let plan = plan(&current, &[]);
        assert_eq!(plan.range, "Sheet1!A2:A2");
        assert_eq!(plan.values, vec![strings(&[""])]);
    }

    #[test]
    fn planning_twice_is_stable() {
        let current = vec![strings(&["Company"]), strings(&["Acme"])];
        let records = vec![ExtractionRecord::new("Acme", "a@x.com")];
        let first = plan(&current, &records);
        let second = plan(&first.values, &records);

        assert_eq!(second.kind, PlanKind::OverwriteColumn { column: 1 });
        assert_eq!(second.values, vec![strings(&["a@x.com"])]);
    }

    struct MockSheet {
        current: Vec<Vec<String>>,
        read_error: Mutex<Option<SheetsError>>,
        write_error: Mutex<Option<SheetsError>>,
        writes: Mutex<VecDeque<(String, Vec<Vec<String>>)>>,
    }

    impl MockSheet {
        fn new(current: Vec<Vec<String>>) -> Self {
            Self {
                current,
                read_error: Mutex::new(None),
                write_error: Mutex::new(None),
                writes: Mutex::new(VecDeque::new()),
            }
        }
    }

    impl SheetsApi for MockSheet {
        async fn get_values(
            &self,
            _sheet_id: &str,
            range: &str,
        ) -> Result<Vec<Vec<String>>, SheetsError> {
            assert_eq!(range, SHEET_RANGE);
            match self.read_error.lock().unwrap().take() {
                Some(e) => Err(e),
                None => Ok(self.current.clone()),
            }
        }

        async fn update_values(
            &self,
            _sheet_id: &str,
            range: &str,
            values: &[Vec<String>],
        ) -> Result<UpdateSummary, SheetsError> {
            if let Some(e) = self.write_error.lock().unwrap().take() {
                return Err(e);
            }
            self.writes
                .lock()
                .unwrap()
                .push_back((range.to_string(), values.to_vec()));
            Ok(UpdateSummary {
                updated_range: Some(range.to_string()),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn write_back_reads_plans_and_writes() {
        let sheet = MockSheet::new(vec![strings(&["Company"]), strings(&["Acme"])]);
        let summary = write_back(&sheet, "abc", &[ExtractionRecord::new("Acme", "a@x.com")])
            .await
            .unwrap();

        assert_eq!(summary.updated_range.as_deref(), Some("Sheet1!A1:B2"));
        let writes = sheet.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1[1], strings(&["Acme", "a@x.com"]));
    }

    #[tokio::test]
    async fn header_only_sheet_with_email_column_writes_nothing() {
        let sheet = MockSheet::new(vec![strings(&["Company", "Email"])]);
        write_back(&sheet, "abc", &[ExtractionRecord::new("Acme", "a@x.com")])
            .await
            .unwrap();
        assert!(sheet.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_failure_skips_write() {
        let sheet = MockSheet::new(vec![]);
        *sheet.read_error.lock().unwrap() = Some(SheetsError::NotFound("abc".into()));

        let err = write_back(&sheet, "abc", &[]).await.unwrap_err();
        assert!(matches!(err, SheetsError::NotFound(_)));
        assert!(sheet.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn write_failure_is_returned() {
        let sheet = MockSheet::new(vec![]);
        *sheet.write_error.lock().unwrap() = Some(SheetsError::Forbidden("denied".into()));

        let err = write_back(&sheet, "abc", &[ExtractionRecord::new("Acme", "a@x.com")])
            .await
            .unwrap_err();
        assert!(matches!(err, SheetsError::Forbidden(_)));
    }
}
