//! Tabular resources and the merge engine
//!
//! A table is a header list plus positionally aligned rows. Rows have no
//! identity key: row `i` of an AI response always lands on row `i` of the
//! existing table.

pub mod parser;

pub use parser::{parse_rows, rows_from_value};

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// One AI-generated row, keyed by column header
pub type AiRow = AHashMap<String, String>;

/// Header/row data behind table components and uploaded documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableData {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell value, empty for ragged or missing cells
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Format each row as `[Column: value]` segments for the selected columns.
    ///
    /// Columns missing from the table are skipped; rows where every selected
    /// cell is blank are dropped.
    pub fn format_rows(&self, columns: &[String]) -> Vec<String> {
        let indices: Vec<(usize, &String)> = columns
            .iter()
            .filter_map(|c| self.column_index(c).map(|i| (i, c)))
            .collect();

        if indices.is_empty() {
            return Vec::new();
        }

        (0..self.rows.len())
            .filter(|&row| indices.iter().any(|(i, _)| !self.cell(row, *i).trim().is_empty()))
            .map(|row| {
                indices
                    .iter()
                    .map(|(i, name)| format!("[{}: {}]", name, self.cell(row, *i)))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect()
    }
}

/// Existing headers in their original order followed by any new output columns
fn merged_headers(existing: &TableData, output_columns: &[String]) -> Vec<String> {
    let mut headers = existing.headers.clone();
    for column in output_columns {
        if !headers.contains(column) {
            headers.push(column.clone());
        }
    }
    headers
}

/// Merge AI rows into an existing table.
///
/// Non-output columns are copied from the existing rows; output columns are
/// overwritten from `ai_rows[i]`, or emptied when the AI row or its key is
/// missing. No existing header is ever removed or reordered.
pub fn merge_table_data(existing: &TableData, ai_rows: &[AiRow], output_columns: &[String]) -> TableData {
    let headers = merged_headers(existing, output_columns);
    let outputs: AHashSet<&str> = output_columns.iter().map(String::as_str).collect();
    let row_count = existing.rows.len().max(ai_rows.len());

    let rows = (0..row_count)
        .map(|i| {
            headers
                .iter()
                .enumerate()
                .map(|(j, header)| {
                    if outputs.contains(header.as_str()) {
                        ai_rows
                            .get(i)
                            .and_then(|row| row.get(header))
                            .cloned()
                            .unwrap_or_default()
                    } else {
                        existing.cell(i, j).to_string()
                    }
                })
                .collect()
        })
        .collect();

    TableData { headers, rows }
}

/// Snapshot shown while a call is in flight.
///
/// Every existing row gets `marker` in each output column. An empty table
/// with at least one output column gets `placeholder_rows` skeleton rows.
pub fn loading_snapshot(
    existing: &TableData,
    output_columns: &[String],
    marker: &str,
    placeholder_rows: usize,
) -> TableData {
    let headers = merged_headers(existing, output_columns);
    let outputs: AHashSet<&str> = output_columns.iter().map(String::as_str).collect();

    let row_count = if existing.rows.is_empty() && !output_columns.is_empty() {
        placeholder_rows
    } else {
        existing.rows.len()
    };

    let rows = (0..row_count)
        .map(|i| {
            headers
                .iter()
                .enumerate()
                .map(|(j, header)| {
                    if outputs.contains(header.as_str()) {
                        marker.to_string()
                    } else {
                        existing.cell(i, j).to_string()
                    }
                })
                .collect()
        })
        .collect();

    TableData { headers, rows }
}
