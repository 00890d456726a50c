//! Common test utilities and helpers


use std::sync::Arc;
use std::time::Duration;

use rule1::api::{ApiRateLimiter, StockrowClient};
use rule1::parser::CsvParser;

/// Client against a mock server, decoding CSV bodies
pub fn csv_client(base_url: &str, timeout: Duration) -> StockrowClient {
    StockrowClient::with_parser(
        base_url,
        timeout,
        ApiRateLimiter::unlimited(),
        Arc::new(CsvParser),
    )
    .expect("Failed to build client")
}

pub fn tickers(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

/// Logging utilities for tests
pub mod logging {
    use std::sync::Once;
    use tracing::info;

    static INIT: Once = Once::new();

    /// Initialize test logging
    pub fn init_test_logging() {
        INIT.call_once(|| {
            // Another test harness may already have installed a subscriber.
            let _ = tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_env_filter("rule1=debug")
                    .with_test_writer()
                    .finish(),
            );
        });
    }

    /// Log test step
    pub fn log_test_step(step: &str) {
        info!("🧪 Test Step: {}", step);
    }
}
