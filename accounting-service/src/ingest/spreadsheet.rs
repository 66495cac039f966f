//! Decoding uploaded files into a [`RawSheet`].
//!
//! Workbooks are read with calamine (first worksheet only); CSV goes through
//! the csv crate with a `,`/`;` delimiter sniff.

use super::normalizer::{RawCell, RawSheet};
use crate::error::IngestError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDate;
use std::io::Cursor;

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["xlsx", "xls", "xlsm", "ods", "csv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Workbook,
    Csv,
}

fn source_kind(filename: &str) -> Result<SourceKind, IngestError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => Ok(SourceKind::Csv),
        ext if SUPPORTED_EXTENSIONS.contains(&ext) => Ok(SourceKind::Workbook),
        _ => Err(IngestError::validation(format!(
            "Unsupported file '{}'; upload one of: .{}",
            filename,
            SUPPORTED_EXTENSIONS.join(", .")
        ))),
    }
}

/// Decode `bytes` according to the extension of `filename`.
pub fn read_sheet(filename: &str, bytes: &[u8]) -> Result<RawSheet, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::validation("The uploaded file is empty"));
    }

    let grid = match source_kind(filename)? {
        SourceKind::Workbook => read_workbook(bytes)?,
        SourceKind::Csv => read_csv(bytes)?,
    };

    let mut rows = grid.into_iter();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| IngestError::validation("The file has no header row"))?
        .into_iter()
        .map(|cell| match cell {
            RawCell::Text(s) => s,
            RawCell::Number(n) => n.to_string(),
            _ => String::new(),
        })
        .collect();

    Ok(RawSheet {
        headers,
        rows: rows.collect(),
    })
}

fn read_workbook(bytes: &[u8]) -> Result<Vec<Vec<RawCell>>, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IngestError::validation(format!("Failed to open workbook: {}", e)))?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IngestError::validation("The workbook contains no sheets"))?;

    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| IngestError::validation(format!("Failed to read sheet '{}': {}", first, e)))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect())
}

fn convert_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) if s.trim().is_empty() => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Float(n) => RawCell::Number(*n),
        Data::Int(n) => RawCell::Number(*n as f64),
        Data::Bool(b) => RawCell::Bool(*b),
        Data::DateTime(dt) => serial_to_date(dt.as_f64())
            .map(RawCell::Date)
            .unwrap_or(RawCell::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Error(e) => RawCell::Text(format!("#{:?}", e)),
    }
}

/// Whole days since 1899-12-30; the time of day is discarded.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?
        .checked_add_days(chrono::Days::new(serial.floor() as u64))
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<RawCell>>, IngestError> {
    let content = decode_text(bytes);
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result
            .map_err(|e| IngestError::validation(format!("Failed to parse CSV: {}", e)))?;
        grid.push(record.iter().map(RawCell::from).collect());
    }
    Ok(grid)
}

/// UTF-8 first, then Windows-1252 for files exported by older spreadsheet tools.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

fn sniff_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}
