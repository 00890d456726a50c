use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use super::{ApiRateLimiter, FetchedStatement, StatementSource};
use crate::error::{FetchError, FetchFailure};
use crate::models::{Config, Section};
use crate::parser::{StatementParser, XlsxParser};

/// Downloads statement spreadsheets from the provider's financials endpoint
pub struct StockrowClient {
    client: Client,
    base_url: Url,
    parser: Arc<dyn StatementParser>,
    rate_limiter: ApiRateLimiter,
}

impl StockrowClient {
    /// Create a client for the configured provider, parsing xlsx responses
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_parser(
            &config.provider_url,
            config.request_timeout,
            ApiRateLimiter::new(config.rate_limit_per_minute),
            Arc::new(XlsxParser),
        )
    }

    pub fn with_parser(
        base_url: &str,
        timeout: Duration,
        rate_limiter: ApiRateLimiter,
        parser: Arc<dyn StatementParser>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Provider URL cannot be used as a base: {}", base_url));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent("rule1/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url,
            parser,
            rate_limiter,
        })
    }

    /// `{base}/api/companies/{ticker}/financials.xlsx?dimension=MRY&section=...&sort=asc`
    pub fn statement_url(&self, ticker: &str, section: Section) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "companies", ticker, "financials.xlsx"]);
        }
        // The label is stored pre-escaped; set_query keeps it as is.
        url.set_query(Some(&format!(
            "dimension=MRY&section={}&sort=asc",
            section.query_label()
        )));
        url
    }

    async fn download(&self, url: Url) -> Result<Vec<u8>, FetchFailure> {
        self.rate_limiter.wait().await;

        debug!("Making request to: {}", url);
        let response = self.client.get(url).send().await.map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::NonSuccessStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(transport_failure)?;
        Ok(body.to_vec())
    }
}

fn transport_failure(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::NetworkFailure(e.to_string())
    }
}

#[async_trait]
impl StatementSource for StockrowClient {
    async fn fetch(&self, ticker: &str, section: Section) -> Result<FetchedStatement, FetchError> {
        let url = self.statement_url(ticker, section);
        let bytes = self
            .download(url)
            .await
            .map_err(|cause| FetchError::new(ticker, section, cause))?;

        let statement = self
            .parser
            .parse(ticker, &bytes)
            .map_err(|e| FetchError::new(ticker, section, e.into()))?;

        info!("Downloaded {} for {} ({} bytes)", section, ticker, bytes.len());
        Ok(FetchedStatement { statement, bytes })
    }
}
