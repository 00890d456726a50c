//! Quarter-scoped on-disk statement cache
//!
//! Entries are keyed by ticker, section and the calendar quarter they were
//! downloaded in. A new quarter yields new keys, so stale files are never read
//! again; they are left on disk rather than deleted.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{RawStatement, Section};
use crate::parser::StatementParser;

/// Calendar quarter (1..=4) of a date
pub fn quarter_of(date: NaiveDate) -> u32 {
    1 + (date.month() - 1) / 3
}

/// Cache identifier, e.g. `AAPL_INCOME_2024_Q3`
pub fn cache_key(ticker: &str, section: Section, date: NaiveDate) -> String {
    format!(
        "{}_{}_{}_Q{}",
        ticker,
        section.cache_name(),
        date.year(),
        quarter_of(date)
    )
}

/// Raw statement files under a single root directory
pub struct StatementCache {
    root: PathBuf,
    parser: Arc<dyn StatementParser>,
}

impl StatementCache {
    pub fn new(root: impl Into<PathBuf>, parser: Arc<dyn StatementParser>) -> Self {
        Self {
            root: root.into(),
            parser,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry for `date`'s quarter
    pub fn entry_path(&self, ticker: &str, section: Section, date: NaiveDate) -> PathBuf {
        self.root.join(format!(
            "{}.{}",
            cache_key(ticker, section, date),
            self.parser.extension()
        ))
    }

    /// Load the current quarter's statement, `None` if it was never stored
    pub async fn get(&self, ticker: &str, section: Section) -> Result<Option<RawStatement>> {
        self.get_at(ticker, section, today()).await
    }

    pub async fn get_at(
        &self,
        ticker: &str,
        section: Section,
        date: NaiveDate,
    ) -> Result<Option<RawStatement>> {
        let path = self.entry_path(ticker, section, date);
        let Some(bytes) = read_entry(&path).await? else {
            debug!("Cache miss: {}", path.display());
            return Ok(None);
        };

        let statement = self
            .parser
            .parse(ticker, &bytes)
            .map_err(|source| Error::CacheCorrupt {
                path: path.clone(),
                source,
            })?;

        debug!("Cache hit: {}", path.display());
        Ok(Some(statement))
    }

    /// Raw bytes of the current quarter's entry, without parsing
    pub async fn get_bytes(&self, ticker: &str, section: Section) -> Result<Option<Vec<u8>>> {
        read_entry(&self.entry_path(ticker, section, today())).await
    }

    /// Store downloaded bytes verbatim under the current quarter's key
    pub async fn put(&self, ticker: &str, section: Section, bytes: &[u8]) -> Result<PathBuf> {
        self.put_at(ticker, section, bytes, today()).await
    }

    pub async fn put_at(
        &self,
        ticker: &str,
        section: Section,
        bytes: &[u8],
        date: NaiveDate,
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::storage(&self.root, e))?;

        let path = self.entry_path(ticker, section, date);
        // Write next to the target and rename so readers never see a partial file.
        let partial = path.with_extension(format!("{}.part", self.parser.extension()));
        tokio::fs::write(&partial, bytes)
            .await
            .map_err(|e| Error::storage(&partial, e))?;
        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|e| Error::storage(&path, e))?;

        debug!("Cached {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn read_entry(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::storage(path, e)),
    }
}
