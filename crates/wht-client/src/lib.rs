//! # wht-client — Outbound Collaborators
//!
//! The audit engine depends on two external services it does not own:
//! - the **CNPJ registry**, which answers with a company's legal name,
//!   registration status and economic activities
//! - the **SGS time-series API** of the central bank, which publishes the
//!   benchmark interest rate used for monetary correction
//!
//! Each is reached through an object-safe async trait ([`FiscalRegistry`],
//! [`BenchmarkRateSource`]) so the engine can run against the HTTP clients in
//! this crate or against the in-process mocks in [`mock`].
//!
//! ## Transport
//!
//! Every request carries the configured timeout. Transport failures and 5xx
//! answers are retried under the configured [`RetryPolicy`] (by default three
//! retries at 200ms, 400ms and 800ms). Other status errors are returned
//! immediately.

pub mod benchmark;
pub mod config;
pub mod error;
pub mod mock;
pub mod registry;
pub mod retry;

pub use benchmark::{BenchmarkRateSource, SgsRateClient};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use mock::{MockRateSource, MockRegistry};
pub use retry::RetryPolicy;
pub use registry::{CnpjRegistryClient, FiscalRegistry, RegistryActivity, RegistryCompany};

use std::time::Duration;

/// Top-level client. Holds one sub-client per collaborator.
#[derive(Debug, Clone)]
pub struct WhtClient {
    registry: CnpjRegistryClient,
    rates: SgsRateClient,
}

impl WhtClient {
    /// Create the clients from configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let registry_http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                if let Some(token) = &config.registry_token {
                    headers.insert(
                        reqwest::header::AUTHORIZATION,
                        reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                            .map_err(|_| ClientError::Config(ConfigError::InvalidToken))?,
                    );
                }
                headers
            })
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        let rates_http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            registry: CnpjRegistryClient::new(
                registry_http,
                config.registry_url.clone(),
                config.timeout_secs,
                config.retry,
            ),
            rates: SgsRateClient::new(
                rates_http,
                config.rates_url.clone(),
                config.rate_series,
                config.timeout_secs,
                config.retry,
            ),
        })
    }

    /// Access the CNPJ registry client.
    pub fn registry(&self) -> &CnpjRegistryClient {
        &self.registry
    }

    /// Access the benchmark rate client.
    pub fn rates(&self) -> &SgsRateClient {
        &self.rates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_and_without_token() {
        let with = ClientConfig::local_mock("http://127.0.0.1:9000", Some("t")).unwrap();
        assert!(WhtClient::new(with).is_ok());
        let without = ClientConfig::local_mock("http://127.0.0.1:9000", None).unwrap();
        let client = WhtClient::new(without).unwrap();
        assert_eq!(client.rates().series(), config::DEFAULT_RATE_SERIES);
    }

    #[test]
    fn rejects_token_with_newline() {
        let cfg = ClientConfig::local_mock("http://127.0.0.1:9000", Some("bad\ntoken")).unwrap();
        assert!(matches!(
            WhtClient::new(cfg),
            Err(ClientError::Config(ConfigError::InvalidToken))
        ));
    }
}
