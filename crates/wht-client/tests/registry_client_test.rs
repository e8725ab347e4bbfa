//! Contract tests for the CNPJ registry client.
//!
//! ## Endpoints Tested
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | GET    | `/cnpj/{cnpj}` | `lookup_*` |

use std::time::Duration;

use wht_client::{ClientConfig, ClientError, FiscalRegistry, RetryPolicy, WhtClient};
use wht_core::SupplierId;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer, token: Option<&str>) -> WhtClient {
    let mut config = ClientConfig::local_mock(&format!("{}/api/v1", mock_server.uri()), token).unwrap();
    config.timeout_secs = 1;
    config.retry = RetryPolicy::none();
    WhtClient::new(config).unwrap()
}

fn supplier() -> SupplierId {
    SupplierId::new("11222333000181").unwrap()
}

#[tokio::test]
async fn lookup_sends_correct_path_and_returns_company() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/cnpj/11222333000181"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cnpj": "11222333000181",
            "razao_social": "ACME SERVICOS LTDA",
            "nome_fantasia": "ACME",
            "atividade_principal": { "codigo": "6201501", "descricao": "Software" },
            "atividades_secundarias": [
                { "codigo": "6202300", "descricao": "Consultoria" }
            ],
            "situacao_cadastral": "ATIVA",
            "municipio": "Sao Paulo",
            "uf": "SP"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, Some("test-token"));
    let company = client.registry().lookup(&supplier()).await.unwrap();
    assert_eq!(company.razao_social, "ACME SERVICOS LTDA");
    assert_eq!(company.atividade_principal.codigo, "6201501");
    assert_eq!(company.atividades_secundarias.len(), 1);
    assert_eq!(company.uf.as_deref(), Some("SP"));
}

#[tokio::test]
async fn lookup_maps_404_to_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/cnpj/11222333000181"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, None);
    let err = client.registry().lookup(&supplier()).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound { ref key, .. } if key == "11222333000181"));
}

#[tokio::test]
async fn lookup_handles_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/cnpj/11222333000181"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, None);
    match client.registry().lookup(&supplier()).await {
        Err(ClientError::ApiError { status, body, .. }) => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn lookup_handles_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/cnpj/11222333000181"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, None);
    let err = client.registry().lookup(&supplier()).await.unwrap_err();
    assert!(matches!(err, ClientError::Deserialization { .. }));
}

#[tokio::test]
async fn lookup_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/cnpj/11222333000181"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, None);
    let err = client.registry().lookup(&supplier()).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout { elapsed_ms: 1000, .. }));
}
