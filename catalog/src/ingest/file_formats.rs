//! Tabular file decoding: CSV and Excel (`.xls`/`.xlsx`) into header-keyed
//! JSON rows, the common currency `RowSchema::from_value` consumes (§6).

use calamine::{open_workbook_auto_from_rs, Reader};
use std::io::Cursor;

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Excel,
}

impl FileFormat {
    pub fn from_filename(name: &str) -> Result<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".csv") {
            Ok(FileFormat::Csv)
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            Ok(FileFormat::Excel)
        } else {
            Err(Error::validation("file", format!("unsupported file extension in {name:?}; expected .csv, .xls, or .xlsx")))
        }
    }
}

/// Decodes raw file bytes into one JSON object per data row, keyed by the
/// header row's column names. UTF-8 only for CSV, per §6.
pub fn decode_rows(format: FileFormat, bytes: &[u8]) -> Result<Vec<serde_json::Value>> {
    match format {
        FileFormat::Csv => decode_csv(bytes),
        FileFormat::Excel => decode_excel(bytes),
    }
}

fn decode_csv(bytes: &[u8]) -> Result<Vec<serde_json::Value>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|err| Error::validation("file", format!("invalid CSV header row: {err}")))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| Error::validation("file", format!("invalid CSV row: {err}")))?;
        let mut object = serde_json::Map::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            if value.trim().is_empty() {
                continue;
            }
            object.insert(header.to_string(), serde_json::Value::String(value.to_string()));
        }
        rows.push(serde_json::Value::Object(object));
    }
    Ok(rows)
}

fn decode_excel(bytes: &[u8]) -> Result<Vec<serde_json::Value>> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor).map_err(|err| Error::validation("file", format!("unreadable workbook: {err}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::validation("file", "workbook has no sheets"))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| Error::validation("file", format!("unreadable sheet {sheet_name:?}: {err}")))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row.iter().map(|cell| cell.to_string()).collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for data_row in rows_iter {
        let mut object = serde_json::Map::new();
        for (header, cell) in headers.iter().zip(data_row.iter()) {
            let rendered = cell.to_string();
            if rendered.trim().is_empty() {
                continue;
            }
            object.insert(header.clone(), serde_json::Value::String(rendered));
        }
        rows.push(serde_json::Value::Object(object));
    }
    Ok(rows)
}
