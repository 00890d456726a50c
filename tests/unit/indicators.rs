//! Indicator reduction over provider-shaped statements

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use crate::common::fixtures::statement_csv;
use rule1::analysis::compute_all;
use rule1::models::{CompanyStatements, Field, RawStatement, Section};
use rule1::parser::{CsvParser, StatementParser};
use rule1::{compute_indicator, lookup_row, Error};

fn company(ticker: &str) -> CompanyStatements {
    let sections = Section::ALL.into_iter().map(|section| {
        let statement = CsvParser.parse(ticker, &statement_csv(section)).unwrap();
        (section, statement)
    });
    CompanyStatements::assemble(ticker, sections).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
}

#[test]
fn test_every_field_is_found() {
    let statements = company("AAPL");
    for (field, result) in compute_all(&statements) {
        assert!(result.is_ok(), "{} failed: {:?}", field, result);
    }
}

#[test]
fn test_sales_growth_averages() {
    let indicator = compute_indicator(&company("AAPL"), Field::SalesGrowth).unwrap();

    assert_eq!(indicator.field, Field::SalesGrowth);
    assert_close(indicator.year10, 0.091);
    assert_close(indicator.year5, 0.084);
    assert_close(indicator.year1, -0.03);
}

#[test]
fn test_leading_gap_shrinks_ten_year_window() {
    // The first FCF growth year is blank, leaving nine values.
    let statements = company("AAPL");
    let values = lookup_row(&statements, Field::FcfGrowth).unwrap();
    assert_eq!(values[0], None);

    let indicator = compute_indicator(&statements, Field::FcfGrowth).unwrap();
    let expected = (0.39 - 0.25 - 0.03 + 0.26 - 0.08 + 0.25 + 0.27 + 0.2 - 0.11) / 9.0;
    assert_close(indicator.year10, expected);
}

#[test]
fn test_schema_change_is_reported() {
    let mut statements = company("AAPL");
    statements.metrics = RawStatement::default();

    let err = compute_indicator(&statements, Field::Roic).unwrap_err();
    assert_matches!(
        err,
        Error::FieldNotFound { section: Section::Metrics, title: "ROIC" }
    );
    // Other fields are unaffected.
    assert!(compute_indicator(&statements, Field::EpsGrowth).is_ok());
}
