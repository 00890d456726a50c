//! Provider client against a mock HTTP server

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::fixtures::statement_csv;
use crate::common::{csv_client, logging};
use rule1::api::{ApiRateLimiter, StatementSource, StockrowClient};
use rule1::error::FetchFailure;
use rule1::models::{Cell, Section};
use rule1::parser::XlsxParser;

#[test_log::test(tokio::test)]
async fn test_fetch_sends_expected_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/companies/AAPL/financials.xlsx"))
        .and(query_param("dimension", "MRY"))
        .and(query_param("section", "Income Statement"))
        .and(query_param("sort", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(statement_csv(Section::Income)))
        .expect(1)
        .mount(&server)
        .await;

    let client = csv_client(&server.uri(), Duration::from_secs(5));
    let fetched = client.fetch("AAPL", Section::Income).await.unwrap();

    assert_eq!(fetched.bytes, statement_csv(Section::Income));
    assert_eq!(fetched.statement.cell(3, 1), &Cell::Text("Revenue Growth".to_string()));
    assert_eq!(fetched.statement.cell(3, 2), &Cell::Number(0.07));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].url.query(),
        Some("dimension=MRY&section=Income%20Statement&sort=asc")
    );
}

#[tokio::test]
async fn test_non_success_status() {
    logging::init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = csv_client(&server.uri(), Duration::from_secs(5));
    let err = client.fetch("NOPE", Section::Metrics).await.unwrap_err();

    assert_eq!(err.ticker, "NOPE");
    assert_eq!(err.section, Section::Metrics);
    assert_matches!(err.cause, FetchFailure::NonSuccessStatus(404));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    logging::init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(statement_csv(Section::Growth))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = csv_client(&server.uri(), Duration::from_millis(200));
    let err = client.fetch("AAPL", Section::Growth).await.unwrap_err();

    assert_matches!(err.cause, FetchFailure::Timeout);
}

#[tokio::test]
async fn test_unparsable_body() {
    logging::init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = StockrowClient::with_parser(
        &server.uri(),
        Duration::from_secs(5),
        ApiRateLimiter::unlimited(),
        Arc::new(XlsxParser),
    )
    .unwrap();
    let err = client.fetch("AAPL", Section::BalanceSheet).await.unwrap_err();

    assert_matches!(err.cause, FetchFailure::ParseFailure(_));
}

#[tokio::test]
async fn test_unreachable_host_is_network_failure() {
    logging::init_test_logging();
    // Reserve a port, then free it so nothing is listening there.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = csv_client(&format!("http://127.0.0.1:{}", port), Duration::from_secs(5));
    let err = client.fetch("AAPL", Section::CashFlow).await.unwrap_err();

    assert_matches!(err.cause, FetchFailure::NetworkFailure(_));
}
