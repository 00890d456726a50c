use std::path::PathBuf;

use thiserror::Error;

use crate::models::{Field, Section};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures turning spreadsheet bytes into a statement
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("workbook could not be read: {0}")]
    Workbook(String),

    #[error("workbook contains no worksheets")]
    NoWorksheet,

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Why a single provider request failed
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("provider responded with status {0}")]
    NonSuccessStatus(u16),

    #[error("request timed out")]
    Timeout,

    #[error("response could not be parsed: {0}")]
    ParseFailure(#[from] ParseError),
}

impl FetchFailure {
    /// Transient failures a caller may reasonably retry
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchFailure::NetworkFailure(_) | FetchFailure::Timeout => true,
            FetchFailure::NonSuccessStatus(status) => *status >= 500,
            FetchFailure::ParseFailure(_) => false,
        }
    }
}

/// A failed (ticker, section) download
#[derive(Debug, Error)]
#[error("fetching {section} for {ticker} failed: {cause}")]
pub struct FetchError {
    pub ticker: String,
    pub section: Section,
    #[source]
    pub cause: FetchFailure,
}

impl FetchError {
    pub fn new(ticker: &str, section: Section, cause: FetchFailure) -> Self {
        Self {
            ticker: ticker.to_string(),
            section,
            cause,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid ticker list {input:?}: {reason}")]
    Input { input: String, reason: &'static str },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("cache storage failure at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cached statement {} is corrupt: {source}", path.display())]
    CacheCorrupt {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("cannot find title \"{title}\" in section \"{section}\"")]
    FieldNotFound {
        section: Section,
        title: &'static str,
    },

    #[error("no usable values for {field}")]
    EmptySeries { field: Field },

    #[error("statements for {ticker} are missing {section}")]
    IncompleteStatements { ticker: String, section: Section },

    #[error("background task for {ticker} did not complete: {reason}")]
    Task { ticker: String, reason: String },
}

impl Error {
    /// Short stable label used when reporting a failure
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Input { .. } => "input",
            Error::Fetch(_) => "fetch",
            Error::Storage { .. } => "storage",
            Error::CacheCorrupt { .. } => "cache_corrupt",
            Error::FieldNotFound { .. } => "field_not_found",
            Error::EmptySeries { .. } => "empty_series",
            Error::IncompleteStatements { .. } | Error::Task { .. } => "task",
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }
}
