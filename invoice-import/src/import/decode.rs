//! Decode spreadsheet bytes into a grid of raw cells
//!
//! Workbooks (xlsx, xls, xlsb, ods) go through calamine's format detection;
//! CSV goes through the `csv` reader. Only the first sheet is read.
//!
//! CSV carries no cell types, so its cells stay [`RawCell::Untyped`] and are
//! typed later by the field they land in.

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, Sheets, open_workbook_auto_from_rs};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Cursor;

use super::intake::IntakeFile;
use super::record::DATE_FORMAT;

/// A single decoded cell, before any field mapping
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    /// Native date value (naive, as stored in the sheet)
    Date(NaiveDateTime),
    /// Source text from a format without cell types (CSV)
    Untyped(String),
}

impl RawCell {
    pub fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) | RawCell::Untyped(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell as text: integral numbers without decimals, dates as `YYYY-MM-DD`
    pub fn to_text(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Text(s) | RawCell::Untyped(s) => s.clone(),
            RawCell::Number(n) => format_number(*n),
            RawCell::Date(dt) => dt.format(DATE_FORMAT).to_string(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Row-major grid of raw cells; row 0 is the header row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCellGrid {
    rows: Vec<Vec<RawCell>>,
}

impl RawCellGrid {
    pub fn new(rows: Vec<Vec<RawCell>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<RawCell>] {
        &self.rows
    }

    /// Header texts, trimmed
    pub fn header(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.iter().map(|c| c.to_text().trim().to_string()).collect())
            .unwrap_or_default()
    }

    /// Every row after the header
    pub fn data_rows(&self) -> &[Vec<RawCell>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Decode an intake file into a raw cell grid
pub fn decode(file: &IntakeFile) -> Result<RawCellGrid> {
    if file.is_csv() {
        decode_csv(&file.bytes).with_context(|| format!("Failed to decode CSV file: {}", file.name))
    } else {
        decode_workbook(&file.bytes)
            .with_context(|| format!("Failed to decode spreadsheet: {}", file.name))
    }
}

fn decode_workbook(bytes: &[u8]) -> Result<RawCellGrid> {
    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| anyhow!("Failed to open workbook: {}", e))?;

    let range = workbook
        .worksheet_range_at(0)
        .context("Workbook has no sheets")?
        .map_err(|e| anyhow!("Failed to read first sheet: {}", e))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(RawCellGrid::new(rows))
}

fn cell_from_data(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) if s.is_empty() => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Float(f) => RawCell::Number(*f),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => RawCell::Date(naive),
            None => RawCell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(RawCell::Date)
            .unwrap_or_else(|| RawCell::Text(s.clone())),
        Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Error(_) => RawCell::Empty,
    }
}

fn decode_csv(bytes: &[u8]) -> Result<RawCellGrid> {
    // Excel writes a UTF-8 BOM in front of "CSV UTF-8" exports
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", idx + 1))?;
        rows.push(record.iter().map(cell_from_text).collect());
    }

    Ok(RawCellGrid::new(rows))
}

fn cell_from_text(text: &str) -> RawCell {
    if text.trim().is_empty() {
        RawCell::Empty
    } else {
        RawCell::Untyped(text.to_string())
    }
}

/// Parse ISO date or datetime text (`YYYY-MM-DD`, optionally with a time part)
pub fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
