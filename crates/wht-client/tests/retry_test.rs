//! Retry behaviour of the collaborator clients against a flaky server.
//!
//! Mocks are mounted in order: a limited failing mock first
//! (`up_to_n_times`), then the healthy answer it falls through to.

use std::time::Duration;

use chrono::NaiveDate;
use wht_client::{
    BenchmarkRateSource, ClientConfig, ClientError, FiscalRegistry, RetryPolicy, WhtClient,
};
use wht_core::SupplierId;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPANY_PATH: &str = "/cnpj/11222333000181";

fn client(mock_server: &MockServer, max_retries: u32) -> WhtClient {
    let mut config = ClientConfig::local_mock(&mock_server.uri(), None).unwrap();
    config.timeout_secs = 1;
    config.retry = RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(10),
    };
    WhtClient::new(config).unwrap()
}

fn supplier() -> SupplierId {
    SupplierId::new("11222333000181").unwrap()
}

fn company_body() -> serde_json::Value {
    serde_json::json!({
        "cnpj": "11222333000181",
        "razao_social": "ACME SERVICOS LTDA",
        "atividade_principal": { "codigo": "6201501", "descricao": "Software" },
        "atividades_secundarias": [],
        "situacao_cadastral": "ATIVA"
    })
}

#[tokio::test]
async fn registry_recovers_after_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(COMPANY_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(COMPANY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(company_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let company = client(&mock_server, 3)
        .registry()
        .lookup(&supplier())
        .await
        .unwrap();
    assert_eq!(company.razao_social, "ACME SERVICOS LTDA");
}

#[tokio::test]
async fn exhausted_server_errors_surface_last_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(COMPANY_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let err = client(&mock_server, 2)
        .registry()
        .lookup(&supplier())
        .await
        .unwrap_err();
    match err {
        ClientError::ApiError { status, body, .. } => {
            assert_eq!(status, 502);
            assert_eq!(body, "bad gateway");
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(COMPANY_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = client(&mock_server, 3)
        .registry()
        .lookup(&supplier())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ApiError { status: 429, .. }));
}

#[tokio::test]
async fn slow_answer_is_retried_until_one_arrives_in_time() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(COMPANY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(company_body())
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(COMPANY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(company_body()))
        .mount(&mock_server)
        .await;

    let company = client(&mock_server, 1)
        .registry()
        .lookup(&supplier())
        .await
        .unwrap();
    assert_eq!(company.cnpj, "11222333000181");
}

#[tokio::test]
async fn exhausted_timeouts_become_timeout_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(COMPANY_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server, 1)
        .registry()
        .lookup(&supplier())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout { elapsed_ms: 1000, .. }));
}

#[tokio::test]
async fn rate_history_recovers_after_server_error() {
    let mock_server = MockServer::start().await;
    let series_path = "/dados/serie/bcdata.sgs.1178/dados";

    Mock::given(method("GET"))
        .and(path(series_path))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(series_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "data": "02/01/2024", "valor": "11.65" }
        ])))
        .mount(&mock_server)
        .await;

    let samples = client(&mock_server, 1)
        .rates()
        .history(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(samples.len(), 1);
    assert!((samples[0].rate_percent - 11.65).abs() < 1e-9);
}
