//! Row lookup and indicator reduction
//!
//! The provider does not publish a schema. Every [`Field`] is found by the
//! exact title in column 1 of its section; a missing title means the layout
//! changed and is reported as [`Error::FieldNotFound`], never as zero.

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{CompanyStatements, Field, Indicator};

/// At least this many value columns are read, even when trailing ones are empty
const MIN_VALUE_COLUMNS: usize = 10;

/// Values of the first row titled like `field`, from column 2 onwards
pub fn lookup_row(statements: &CompanyStatements, field: Field) -> Result<Vec<Option<f64>>> {
    let spec = field.spec();
    let statement = statements.section(spec.section);

    let row = statement
        .titles()
        .position(|cell| cell.as_text() == Some(spec.title))
        .map(|index| index + 1)
        .ok_or(Error::FieldNotFound {
            section: spec.section,
            title: spec.title,
        })?;

    let last_column = statement.max_column().max(MIN_VALUE_COLUMNS + 1);
    let values = (2..=last_column)
        .map(|column| statement.cell(row, column).as_number())
        .collect();

    debug!("{} for {} found at row {}", field, statements.ticker, row);
    Ok(values)
}

/// Reduce `field` to its 10, 5 and 1 year averages
pub fn compute_indicator(statements: &CompanyStatements, field: Field) -> Result<Indicator> {
    let values = lookup_row(statements, field)?;
    reduce(field, &values)
}

/// Every known field, in table order; failures stay per field
pub fn compute_all(statements: &CompanyStatements) -> Vec<(Field, Result<Indicator>)> {
    Field::ALL
        .into_iter()
        .map(|field| (field, compute_indicator(statements, field)))
        .collect()
}

/// Averages over the trailing 10, 5 and 1 retained values.
///
/// Missing and non-finite values are dropped before windowing, so the
/// 1 year figure is the rightmost usable value.
pub fn reduce(field: Field, values: &[Option<f64>]) -> Result<Indicator> {
    let numbers: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|value| value.is_finite())
        .collect();

    if numbers.is_empty() {
        return Err(Error::EmptySeries { field });
    }

    Ok(Indicator {
        field,
        year10: trailing_mean(&numbers, 10),
        year5: trailing_mean(&numbers, 5),
        year1: trailing_mean(&numbers, 1),
    })
}

fn trailing_mean(numbers: &[f64], window: usize) -> f64 {
    let tail = &numbers[numbers.len().saturating_sub(window)..];
    tail.iter().sum::<f64>() / tail.len() as f64
}
