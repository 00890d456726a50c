//! CSV indicator report
//!
//! One row per (ticker, field). Averages are written as percentages rounded
//! to two decimals; failures carry the error kind and message instead.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::analysis::compute_all;
use crate::concurrent_fetcher::PipelineReport;
use crate::error::Error;
use crate::models::Indicator;

#[derive(Debug, Serialize, PartialEq)]
pub struct ReportRow {
    pub ticker: String,
    pub indicator: String,
    pub ten_year: Option<f64>,
    pub five_year: Option<f64>,
    pub one_year: Option<f64>,
    pub error: Option<String>,
}

impl ReportRow {
    fn from_indicator(ticker: &str, indicator: &Indicator) -> Self {
        Self {
            ticker: ticker.to_string(),
            indicator: indicator.field.to_string(),
            ten_year: Some(as_percent(indicator.year10)),
            five_year: Some(as_percent(indicator.year5)),
            one_year: Some(as_percent(indicator.year1)),
            error: None,
        }
    }

    fn from_error(ticker: &str, indicator: String, error: &Error) -> Self {
        Self {
            ticker: ticker.to_string(),
            indicator,
            ten_year: None,
            five_year: None,
            one_year: None,
            error: Some(format!("{}: {}", error.kind(), error)),
        }
    }
}

fn as_percent(value: f64) -> f64 {
    (value * 100.0 * 100.0).round() / 100.0
}

/// Rows for every ticker in report order
pub fn build_rows(report: &PipelineReport) -> Vec<ReportRow> {
    let mut rows = Vec::new();
    for (ticker, result) in report.iter() {
        match result {
            Ok(statements) => {
                for (field, indicator) in compute_all(statements) {
                    rows.push(match indicator {
                        Ok(indicator) => ReportRow::from_indicator(ticker, &indicator),
                        Err(e) => ReportRow::from_error(ticker, field.to_string(), &e),
                    });
                }
            }
            Err(e) => rows.push(ReportRow::from_error(ticker, String::new(), e)),
        }
    }
    rows
}

pub fn write_report<W: Write>(writer: W, rows: &[ReportRow]) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_report_file(path: &Path, rows: &[ReportRow]) -> csv::Result<()> {
    let file = std::fs::File::create(path)?;
    write_report(file, rows)
}
