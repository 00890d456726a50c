//! End-to-end pipeline: mock provider, temporary cache, indicator reduction

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::fixtures::statement_csv;
use crate::common::logging::{init_test_logging, log_test_step};
use crate::common::{csv_client, tickers};
use rule1::concurrent_fetcher::{Pipeline, TickerFetcher};
use rule1::error::{Error, FetchError, FetchFailure};
use rule1::models::{Field, Section};
use rule1::parser::CsvParser;
use rule1::{compute_indicator, StatementCache};

/// Serve every section of `ticker` exactly once
async fn mount_statements(server: &MockServer, ticker: &str) {
    for section in Section::ALL {
        Mock::given(method("GET"))
            .and(path(format!("/api/companies/{}/financials.xlsx", ticker)))
            .and(query_param("section", section.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(statement_csv(section)))
            .expect(1)
            .mount(server)
            .await;
    }
}

fn pipeline(server: &MockServer, cache: Arc<StatementCache>) -> Pipeline {
    let client = csv_client(&server.uri(), Duration::from_secs(5));
    Pipeline::new(TickerFetcher::new(cache, Arc::new(client)), 4)
}

#[tokio::test]
async fn test_cold_cache_downloads_and_stores_all_sections() {
    init_test_logging();
    log_test_step("Fetching AAPL into an empty cache");

    let dir = tempdir().unwrap();
    let cache = Arc::new(StatementCache::new(dir.path().join("rule1/cache"), Arc::new(CsvParser)));
    let server = MockServer::start().await;
    mount_statements(&server, "AAPL").await;

    let report = pipeline(&server, Arc::clone(&cache)).run(&tickers(&["AAPL"])).await;

    let statements = report.get("AAPL").unwrap().as_ref().unwrap();
    for section in Section::ALL {
        assert_eq!(
            statements.section(section).cell(1, 1).as_text(),
            Some(section.to_string().as_str())
        );
        let stored = cache.get_bytes("AAPL", section).await.unwrap();
        assert_eq!(stored, Some(statement_csv(section)));
    }

    let roic = compute_indicator(statements, Field::Roic).unwrap();
    assert!((roic.year1 - 0.42).abs() < 1e-9);
    assert!((roic.year5 - 0.356).abs() < 1e-9);
}

#[tokio::test]
async fn test_warm_cache_makes_no_requests() {
    init_test_logging();
    log_test_step("Fetching AAPL from a populated cache");

    let dir = tempdir().unwrap();
    let cache = Arc::new(StatementCache::new(dir.path(), Arc::new(CsvParser)));
    for section in Section::ALL {
        cache.put("AAPL", section, &statement_csv(section)).await.unwrap();
    }

    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let report = pipeline(&server, cache).run(&tickers(&["AAPL"])).await;
    assert_eq!(report.succeeded().count(), 1);
}

#[tokio::test]
async fn test_failed_section_fails_only_that_ticker() {
    init_test_logging();
    log_test_step("One ticker with a failing Metrics section");

    let dir = tempdir().unwrap();
    let cache = Arc::new(StatementCache::new(dir.path(), Arc::new(CsvParser)));
    let server = MockServer::start().await;
    mount_statements(&server, "MSFT").await;
    for section in Section::ALL {
        let response = if section == Section::Metrics {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200).set_body_bytes(statement_csv(section))
        };
        // Sibling requests may be cancelled before they reach the server.
        Mock::given(method("GET"))
            .and(path("/api/companies/AAPL/financials.xlsx"))
            .and(query_param("section", section.to_string()))
            .respond_with(response)
            .mount(&server)
            .await;
    }

    let report = pipeline(&server, Arc::clone(&cache)).run(&tickers(&["AAPL", "MSFT"])).await;

    assert_matches!(
        report.get("AAPL"),
        Some(Err(Error::Fetch(FetchError {
            section: Section::Metrics,
            cause: FetchFailure::NonSuccessStatus(500),
            ..
        })))
    );
    assert!(report.get("MSFT").unwrap().is_ok());
    assert!(cache.get_bytes("AAPL", Section::Metrics).await.unwrap().is_none());

    let statements = report.into_statements();
    assert_eq!(statements.len(), 1);
    assert!(statements.contains_key("MSFT"));
}
