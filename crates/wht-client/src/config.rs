//! Collaborator client configuration.
//!
//! Base URLs for the CNPJ registry and the central-bank time-series API.
//! Defaults point to the public production endpoints. Override via
//! environment variables or explicit construction for staging/testing.

use std::time::Duration;

use url::Url;

use crate::retry::RetryPolicy;

/// Default SGS series: SELIC target rate, annualized percent.
pub const DEFAULT_RATE_SERIES: u32 = 1178;

/// Configuration for connecting to the external collaborators.
///
/// Custom `Debug` implementation redacts the `registry_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the CNPJ registry, including its API version path.
    /// Default: <https://www.cnpj.ws/api/v1>
    pub registry_url: Url,
    /// Bearer token for the registry. Public tiers need none.
    pub registry_token: Option<String>,
    /// Base URL of the SGS time-series API.
    /// Default: <https://api.bcb.gov.br>
    pub rates_url: Url,
    /// SGS series code of the benchmark rate.
    pub rate_series: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Retry schedule shared by both collaborators.
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("registry_url", &self.registry_url)
            .field(
                "registry_token",
                &self.registry_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("rates_url", &self.rates_url)
            .field("rate_series", &self.rate_series)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `WHT_REGISTRY_URL` (default: `https://www.cnpj.ws/api/v1`)
    /// - `WHT_REGISTRY_TOKEN` (optional)
    /// - `WHT_RATES_URL` (default: `https://api.bcb.gov.br`)
    /// - `WHT_RATES_SERIES` (default: 1178)
    /// - `WHT_TIMEOUT_SECS` (default: 30)
    /// - `WHT_MAX_RETRIES` (default: 3)
    /// - `WHT_RETRY_BASE_MS` (default: 200)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            registry_url: env_url("WHT_REGISTRY_URL", "https://www.cnpj.ws/api/v1")?,
            registry_token: std::env::var("WHT_REGISTRY_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            rates_url: env_url("WHT_RATES_URL", "https://api.bcb.gov.br")?,
            rate_series: env_number("WHT_RATES_SERIES", DEFAULT_RATE_SERIES)?,
            timeout_secs: env_number("WHT_TIMEOUT_SECS", 30)?,
            retry: RetryPolicy {
                max_retries: env_number("WHT_MAX_RETRIES", 3)?,
                base_delay: Duration::from_millis(env_number("WHT_RETRY_BASE_MS", 200)?),
            },
        })
    }

    /// Create a configuration pointing both collaborators at one local mock
    /// server (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `base` cannot be parsed.
    pub fn local_mock(base: &str, token: Option<&str>) -> Result<Self, ConfigError> {
        let url = Url::parse(base)
            .map_err(|e| ConfigError::InvalidUrl("local_mock".to_string(), e.to_string()))?;
        Ok(Self {
            registry_url: url.clone(),
            registry_token: token.map(str::to_string),
            rates_url: url,
            rate_series: DEFAULT_RATE_SERIES,
            timeout_secs: 5,
            retry: RetryPolicy::default(),
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_number<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: \"{1}\"")]
    InvalidValue(String, String),
    #[error("registry token contains characters not allowed in a header")]
    InvalidToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = ClientConfig::local_mock("http://127.0.0.1:9000", Some("test-token")).unwrap();
        assert_eq!(cfg.registry_token.as_deref(), Some("test-token"));
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.registry_url.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(cfg.rate_series, DEFAULT_RATE_SERIES);
        assert_eq!(cfg.retry, RetryPolicy::default());
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = ClientConfig::local_mock("http://127.0.0.1:9000", Some("s3cret")).unwrap();
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("WHT_NONEXISTENT_VAR_12345", "https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn env_number_rejects_garbage() {
        std::env::set_var("WHT_TEST_BAD_NUMBER", "soon");
        let result: Result<u64, _> = env_number("WHT_TEST_BAD_NUMBER", 30);
        std::env::remove_var("WHT_TEST_BAD_NUMBER");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_, _))));
    }
}
