//! Contract tests for the SGS benchmark rate client.
//!
//! ## Endpoints Tested
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | GET    | `/dados/serie/bcdata.sgs.{series}/dados/ultimos/1` | `latest_*` |
//! | GET    | `/dados/serie/bcdata.sgs.{series}/dados` | `history_*` |

use chrono::NaiveDate;
use wht_client::{BenchmarkRateSource, ClientConfig, ClientError, RetryPolicy, WhtClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer) -> WhtClient {
    let mut config = ClientConfig::local_mock(&mock_server.uri(), None).unwrap();
    config.rate_series = 1178;
    config.retry = RetryPolicy::none();
    WhtClient::new(config).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn latest_returns_most_recent_sample() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dados/serie/bcdata.sgs.1178/dados/ultimos/1"))
        .and(query_param("formato", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "data": "15/01/2024", "valor": "11.65" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let sample = client.rates().latest().await.unwrap();
    assert_eq!(sample.date, date(2024, 1, 15));
    assert_eq!(sample.rate_percent, 11.65);
}

#[tokio::test]
async fn latest_rejects_empty_series() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dados/serie/bcdata.sgs.1178/dados/ultimos/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.rates().latest().await.unwrap_err();
    assert!(matches!(err, ClientError::Malformed { .. }));
}

#[tokio::test]
async fn history_sends_sgs_dates_and_sorts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dados/serie/bcdata.sgs.1178/dados"))
        .and(query_param("dataInicial", "02/01/2024"))
        .and(query_param("dataFinal", "04/01/2024"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "data": "04/01/2024", "valor": "11.65" },
            { "data": "02/01/2024", "valor": "11.75" },
            { "data": "03/01/2024", "valor": 11.65 }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let samples = client
        .rates()
        .history(date(2024, 1, 2), date(2024, 1, 4))
        .await
        .unwrap();
    let dates: Vec<NaiveDate> = samples.iter().map(|s| s.date).collect();
    assert_eq!(dates, vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)]);
    assert_eq!(samples[0].rate_percent, 11.75);
}

#[tokio::test]
async fn history_treats_404_as_empty_range() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dados/serie/bcdata.sgs.1178/dados"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Value(s) not found"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let samples = client
        .rates()
        .history(date(2030, 1, 1), date(2030, 1, 31))
        .await
        .unwrap();
    assert!(samples.is_empty());
}

#[tokio::test]
async fn history_handles_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dados/serie/bcdata.sgs.1178/dados"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .rates()
        .history(date(2024, 1, 1), date(2024, 1, 31))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ApiError { status: 502, .. }));
}
