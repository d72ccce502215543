//! Parsers for the delimited and JSON dashboard resources.

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde_json::Value;
use tracing::debug;

use crate::error::DataError;

/// One delimited data line keyed by the header row.
pub type Row = HashMap<String, String>;

/// A loosely-typed source record, as decoded from JSON or lifted from a [`Row`].
pub type RawRecord = serde_json::Map<String, Value>;

/// Splits delimited text into rows keyed by the first (header) line.
///
/// Each line is one record. Quoting is honoured within a line, so a cell
/// may hold commas, but an unbalanced quote never swallows later lines.
/// Cells are matched to headers by position. Short rows are padded with
/// empty strings and surplus cells are ignored, so this never fails on a
/// ragged line. A payload without at least one data line yields no rows.
pub fn parse_delimited(text: &str) -> Vec<Row> {
    let builder = {
        let mut builder = ReaderBuilder::new();
        builder.has_headers(false).flexible(true).trim(Trim::All);
        builder
    };

    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let header = lines.next().and_then(|(_, line)| split_line(&builder, line));
    let headers: Vec<String> = match header {
        Some(header) => header.iter().map(str::to_string).collect(),
        None => return Vec::new(),
    };

    let mut rows = Vec::new();
    for (index, line) in lines {
        let Some(record) = split_line(&builder, line) else {
            debug!(line = index + 1, "Skipping unreadable line");
            continue;
        };

        let row = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(row);
    }

    rows
}

/// Reads a single line as one record. An unterminated quote runs to the end
/// of the line only.
fn split_line(builder: &ReaderBuilder, line: &str) -> Option<StringRecord> {
    let mut record = StringRecord::new();
    match builder.from_reader(line.as_bytes()).read_record(&mut record) {
        Ok(true) => Some(record),
        Ok(false) => None,
        Err(e) => {
            debug!(error = %e, "Unreadable delimited line");
            None
        }
    }
}

/// Decodes a JSON payload.
///
/// # Errors
///
/// Returns [`DataError::MalformedPayload`] if the payload is not well-formed JSON.
pub fn parse_json(payload: &str) -> Result<Value, DataError> {
    Ok(serde_json::from_str(payload)?)
}

/// Lifts a delimited row into a [`RawRecord`] of string values.
pub fn row_to_record(row: Row) -> RawRecord {
    row.into_iter().map(|(k, v)| (k, Value::String(v))).collect()
}
