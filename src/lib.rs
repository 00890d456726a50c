//! Rule #1 financial statement pipeline
//!
//! Downloads the five statement sections per ticker, caches them for the
//! current quarter and reduces named rows into 10, 5 and 1 year averages.

pub mod analysis;
pub mod api;
pub mod cache;
pub mod concurrent_fetcher;
pub mod error;
pub mod models;
pub mod parser;
pub mod report;
pub mod utils;

pub use analysis::{compute_indicator, lookup_row};
pub use cache::{cache_key, StatementCache};
pub use concurrent_fetcher::{Pipeline, PipelineReport, TickerFetcher};
pub use error::{Error, Result};
pub use models::{CompanyStatements, Config, Field, Indicator, RawStatement, Section};
