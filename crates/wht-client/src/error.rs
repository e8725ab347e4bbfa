//! Collaborator client error types.

use wht_core::{AuditError, ValidationError};

/// Errors from registry and rate-source calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The request did not complete within the configured timeout.
    #[error("{endpoint} timed out after {elapsed_ms}ms")]
    Timeout { endpoint: String, elapsed_ms: u64 },
    /// The collaborator returned a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The collaborator has no record for the requested key.
    #[error("{endpoint} has no record for {key}")]
    NotFound { endpoint: String, key: String },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The response decoded but its content is unusable.
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl ClientError {
    /// Map a transport failure, recognising timeouts.
    pub(crate) fn transport(endpoint: &str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
                elapsed_ms: timeout_secs.saturating_mul(1000),
            }
        } else {
            Self::Http {
                endpoint: endpoint.to_string(),
                source: err,
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Self::Http { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::ApiError { endpoint, .. }
            | Self::NotFound { endpoint, .. }
            | Self::Deserialization { endpoint, .. }
            | Self::Malformed { endpoint, .. } => endpoint,
            Self::Config(_) => "client_init",
        }
    }
}

impl From<ClientError> for AuditError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound { endpoint, key } => AuditError::NotFound {
                kind: "registry record",
                id: format!("{key} ({endpoint})"),
            },
            ClientError::Deserialization { .. } | ClientError::Malformed { .. } => {
                AuditError::Validation(ValidationError::MalformedResponse {
                    collaborator: err.endpoint().to_string(),
                    reason: err.to_string(),
                })
            }
            other => AuditError::Resolution {
                collaborator: other.endpoint().to_string(),
                reason: other.to_string(),
            },
        }
    }
}
