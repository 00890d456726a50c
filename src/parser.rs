//! Spreadsheet decoding
//!
//! The provider serves each statement section as an xlsx workbook with a
//! single worksheet named after the ticker. Only reading is needed: the cache
//! stores the downloaded bytes verbatim and re-parses them on every load.

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx, XlsxError};

use crate::error::ParseError;
use crate::models::{Cell, RawStatement};

/// Turns raw statement bytes into a [`RawStatement`]
pub trait StatementParser: Send + Sync {
    /// `sheet_hint` names the preferred worksheet (the ticker)
    fn parse(&self, sheet_hint: &str, bytes: &[u8]) -> Result<RawStatement, ParseError>;

    /// File extension used for cached payloads
    fn extension(&self) -> &'static str;
}

/// Reads provider xlsx workbooks
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxParser;

impl StatementParser for XlsxParser {
    fn parse(&self, sheet_hint: &str, bytes: &[u8]) -> Result<RawStatement, ParseError> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
            .map_err(|e: XlsxError| ParseError::Workbook(e.to_string()))?;

        let sheet_names = workbook.sheet_names();
        let sheet = sheet_names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(sheet_hint))
            .or_else(|| sheet_names.first())
            .cloned()
            .ok_or(ParseError::NoWorksheet)?;

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| ParseError::Workbook(e.to_string()))?;

        // The used range may not start at A1; keep absolute coordinates.
        let (row_offset, col_offset) = range
            .start()
            .map(|(row, col)| (row as usize, col as usize))
            .unwrap_or((0, 0));

        let mut rows = vec![Vec::new(); row_offset];
        for source_row in range.rows() {
            let mut cells = vec![Cell::Empty; col_offset];
            cells.extend(source_row.iter().map(convert_cell));
            rows.push(cells);
        }

        Ok(RawStatement::new(rows))
    }

    fn extension(&self) -> &'static str {
        "xlsx"
    }
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Float(value) => Cell::Number(*value),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::String(text) => Cell::from_text(text),
        other => Cell::Text(other.to_string()),
    }
}

/// Header-less CSV, one statement row per record
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvParser;

impl StatementParser for CsvParser {
    fn parse(&self, _sheet_hint: &str, bytes: &[u8]) -> Result<RawStatement, ParseError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::from_text).collect());
        }

        Ok(RawStatement::new(rows))
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}
