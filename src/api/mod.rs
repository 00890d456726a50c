use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::warn;

use crate::error::FetchError;
use crate::models::{RawStatement, Section};

pub mod stockrow_client;
pub use stockrow_client::StockrowClient;

/// A downloaded statement together with the bytes it was parsed from
#[derive(Debug, Clone)]
pub struct FetchedStatement {
    pub statement: RawStatement,
    pub bytes: Vec<u8>,
}

/// Remote source of raw statements. Knows nothing about caching.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatementSource: Send + Sync {
    async fn fetch(&self, ticker: &str, section: Section) -> Result<FetchedStatement, FetchError>;
}

/// Client-side request budget shared by every fetch
#[derive(Clone)]
pub struct ApiRateLimiter {
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl ApiRateLimiter {
    /// `0` disables limiting
    pub fn new(requests_per_minute: u32) -> Self {
        let limiter = NonZeroU32::new(requests_per_minute)
            .map(|rate| Arc::new(RateLimiter::direct(Quota::per_minute(rate))));

        Self { limiter }
    }

    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

/// Retries transient failures of an inner source.
///
/// The pipeline never retries on its own; callers that want retries wrap
/// their source in this.
pub struct RetryingSource<S> {
    inner: S,
    attempts: u32,
    delay: Duration,
}

impl<S: StatementSource> RetryingSource<S> {
    pub fn new(inner: S, attempts: u32, delay: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            delay,
        }
    }
}

#[async_trait]
impl<S: StatementSource> StatementSource for RetryingSource<S> {
    async fn fetch(&self, ticker: &str, section: Section) -> Result<FetchedStatement, FetchError> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch(ticker, section).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) if attempt < self.attempts && e.cause.is_retryable() => {
                    warn!(
                        "Attempt {} failed for {} {}: {}. Retrying...",
                        attempt, ticker, section, e.cause
                    );
                    attempt += 1;
                    tokio::time::sleep(self.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
