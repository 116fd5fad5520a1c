//! Extraction results and their delimited-text exports.

use std::collections::HashMap;

use serde::Deserialize;

use crate::table::Table;

/// Value the model is told to answer with when nothing was found, also the
/// write-back fallback for rows without a result.
pub const NOT_FOUND: &str = "Email Not Found";

/// Column the merged export fills from the results.
pub const MERGED_COLUMN: &str = "email";

pub const EXTRACTED_FILE_NAME: &str = "extracted_results.csv";
pub const MERGED_FILE_NAME: &str = "complete_dataset.csv";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractionRecord {
    #[serde(rename = "company")]
    pub entity: String,
    #[serde(rename = "email")]
    pub value: String,
}

impl ExtractionRecord {
    pub fn new(entity: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            value: value.into(),
        }
    }
}

/// Entity → value join map. Duplicate entities collapse to the last record.
pub fn lookup(records: &[ExtractionRecord]) -> HashMap<&str, &str> {
    records
        .iter()
        .map(|r| (r.entity.as_str(), r.value.as_str()))
        .collect()
}

fn writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, csv::Error> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    // Every field written came from a `String`.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Raw export: `"company","email"` header plus one quoted line per record.
pub fn to_csv(records: &[ExtractionRecord]) -> Result<String, csv::Error> {
    let mut wtr = writer();
    wtr.write_record(["company", "email"])?;
    for record in records {
        wtr.write_record([&record.entity, &record.value])?;
    }
    into_string(wtr)
}

/// Left-join the results onto `table` through `entity_column`.
///
/// The `email` column is overwritten when present and appended otherwise;
/// rows without a result get an empty cell. An unknown entity column leaves
/// every cell empty.
pub fn merge(table: &Table, entity_column: &str, records: &[ExtractionRecord]) -> Table {
    let map = lookup(records);
    let key_idx = table.column_index(entity_column);

    let mut headers = table.headers.clone();
    let target = match table.column_index(MERGED_COLUMN) {
        Some(idx) => idx,
        None => {
            headers.push(MERGED_COLUMN.to_string());
            headers.len() - 1
        }
    };

    let rows = table
        .rows
        .iter()
        .map(|row| {
            let value = key_idx
                .and_then(|k| row.get(k))
                .and_then(|entity| map.get(entity.as_str()))
                .map(|v| v.to_string())
                .unwrap_or_default();
            let mut row = row.clone();
            if row.len() <= target {
                row.resize(target + 1, String::new());
            }
            row[target] = value;
            row
        })
        .collect();

    Table::new(headers, rows)
}

/// Serialize a whole table with every field quoted and `\n` line endings.
pub fn table_to_csv(table: &Table) -> Result<String, csv::Error> {
    let mut wtr = writer();
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    into_string(wtr)
}
