//! Concurrent statement fetching
//!
//! Each ticker fans out into one task per section and joins them before
//! anything is returned. Tickers themselves run as separate tasks, bounded by
//! a semaphore. A failing section aborts its siblings; other tickers carry on.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::api::StatementSource;
use crate::cache::StatementCache;
use crate::error::{Error, Result};
use crate::models::{CompanyStatements, RawStatement, Section};
use crate::utils::unique_tickers;

/// Where a section came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOrigin {
    Cache,
    Remote,
}

/// Emitted once per completed section fetch
#[derive(Debug, Clone)]
pub struct FetchProgress {
    pub ticker: String,
    pub section: Section,
    pub origin: StatementOrigin,
}

/// Obtains all statement sections for one ticker, cache first
#[derive(Clone)]
pub struct TickerFetcher {
    cache: Arc<StatementCache>,
    source: Arc<dyn StatementSource>,
    progress: Option<broadcast::Sender<FetchProgress>>,
}

impl TickerFetcher {
    pub fn new(cache: Arc<StatementCache>, source: Arc<dyn StatementSource>) -> Self {
        Self {
            cache,
            source,
            progress: None,
        }
    }

    /// Publish a [`FetchProgress`] for every finished section
    pub fn with_progress(mut self, sender: broadcast::Sender<FetchProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Fetch the five sections concurrently; any failure fails the ticker
    pub async fn fetch_all(&self, ticker: &str) -> Result<CompanyStatements> {
        let mut tasks = JoinSet::new();
        for section in Section::ALL {
            let fetcher = self.clone();
            let ticker = ticker.to_string();
            tasks.spawn(async move {
                let statement = fetcher.fetch_section(&ticker, section).await?;
                Ok::<_, Error>((section, statement))
            });
        }

        let mut sections = Vec::with_capacity(Section::ALL.len());
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| Error::Task {
                ticker: ticker.to_string(),
                reason: e.to_string(),
            });
            match outcome.and_then(|result| result) {
                Ok(section) => sections.push(section),
                Err(e) => {
                    // Outstanding siblings are cancelled; their results are never observed.
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        CompanyStatements::assemble(ticker, sections)
    }

    async fn fetch_section(&self, ticker: &str, section: Section) -> Result<RawStatement> {
        if let Some(statement) = self.cache.get(ticker, section).await? {
            self.report(ticker, section, StatementOrigin::Cache);
            return Ok(statement);
        }

        let fetched = self.source.fetch(ticker, section).await?;
        self.cache.put(ticker, section, &fetched.bytes).await?;
        self.report(ticker, section, StatementOrigin::Remote);
        Ok(fetched.statement)
    }

    fn report(&self, ticker: &str, section: Section, origin: StatementOrigin) {
        debug!("{} for {} loaded from {:?}", section, ticker, origin);
        if let Some(sender) = &self.progress {
            // Nobody listening is fine.
            let _ = sender.send(FetchProgress {
                ticker: ticker.to_string(),
                section,
                origin,
            });
        }
    }
}

/// Per-ticker outcome of a pipeline run, in first-seen ticker order
#[derive(Debug, Default)]
pub struct PipelineReport {
    order: Vec<String>,
    results: HashMap<String, Result<CompanyStatements>>,
}

impl PipelineReport {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, ticker: &str) -> Option<&Result<CompanyStatements>> {
        self.results.get(ticker)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Result<CompanyStatements>)> + '_ {
        self.order
            .iter()
            .filter_map(|ticker| self.results.get(ticker).map(|r| (ticker.as_str(), r)))
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &CompanyStatements)> + '_ {
        self.iter()
            .filter_map(|(ticker, result)| result.as_ref().ok().map(|s| (ticker, s)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &Error)> + '_ {
        self.iter()
            .filter_map(|(ticker, result)| result.as_ref().err().map(|e| (ticker, e)))
    }

    /// Successful statements keyed by ticker
    pub fn into_statements(self) -> HashMap<String, CompanyStatements> {
        self.results
            .into_iter()
            .filter_map(|(ticker, result)| result.ok().map(|s| (ticker, s)))
            .collect()
    }
}

/// Runs [`TickerFetcher`] over many tickers with bounded concurrency
pub struct Pipeline {
    fetcher: TickerFetcher,
    max_concurrent: usize,
}

impl Pipeline {
    pub fn new(fetcher: TickerFetcher, max_concurrent: usize) -> Self {
        Self {
            fetcher,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub async fn run(&self, tickers: &[String]) -> PipelineReport {
        let mut report = PipelineReport {
            order: unique_tickers(tickers),
            ..PipelineReport::default()
        };

        info!(
            "🚀 Fetching statements for {} tickers ({} at a time)",
            report.order.len(),
            self.max_concurrent
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();
        for ticker in report.order.iter().cloned() {
            let fetcher = self.fetcher.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => fetcher.fetch_all(&ticker).await,
                    Err(e) => Err(Error::Task {
                        ticker: ticker.clone(),
                        reason: e.to_string(),
                    }),
                };
                (ticker, result)
            });
        }

        // The join loop is the only writer to the result map.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((ticker, result)) => {
                    if let Err(e) = &result {
                        error!("❌ {} failed ({}): {}", ticker, e.kind(), e);
                    } else {
                        debug!("✅ {} complete", ticker);
                    }
                    report.results.insert(ticker, result);
                }
                Err(e) => error!("Ticker task panicked: {}", e),
            }
        }

        // A panicked task leaves no entry; record it as failed.
        for ticker in &report.order {
            if !report.results.contains_key(ticker) {
                report.results.insert(
                    ticker.clone(),
                    Err(Error::Task {
                        ticker: ticker.clone(),
                        reason: "task panicked".to_string(),
                    }),
                );
            }
        }

        info!(
            "📊 Results: {} succeeded, {} failed",
            report.succeeded().count(),
            report.failed().count()
        );
        report
    }
}
