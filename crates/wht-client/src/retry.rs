//! Retry schedule for collaborator calls.
//!
//! The registry and the SGS API both shed load with 5xx answers and drop
//! connections under maintenance windows. Those are retried on a doubling
//! schedule; 4xx answers and decodable bodies go straight back to the caller.

use std::future::Future;
use std::time::Duration;

use crate::error::ClientError;

/// How often and how patiently a collaborator call is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one. Zero disables retrying.
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each one after.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Wait before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.min(16)))
    }
}

/// Send a request under `policy`.
///
/// Transport failures and 5xx answers are retried. When the retries run out
/// a 5xx answer is handed back as a response so the caller can report its
/// status and body, and a transport failure becomes [`ClientError::Timeout`]
/// or [`ClientError::Http`].
pub(crate) async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    endpoint: &str,
    timeout_secs: u64,
    send: F,
) -> Result<reqwest::Response, ClientError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut retry = 0;
    loop {
        let outcome = send().await;
        let transient = match &outcome {
            Ok(resp) => resp.status().is_server_error(),
            Err(_) => true,
        };
        if !transient || retry >= policy.max_retries {
            return outcome.map_err(|e| ClientError::transport(endpoint, e, timeout_secs));
        }

        let delay = policy.delay_for(retry);
        match &outcome {
            Ok(resp) => tracing::warn!(
                endpoint,
                retry = retry + 1,
                max_retries = policy.max_retries,
                status = resp.status().as_u16(),
                ?delay,
                "collaborator answered with a server error, retrying"
            ),
            Err(e) => tracing::warn!(
                endpoint,
                retry = retry + 1,
                max_retries = policy.max_retries,
                error = %e,
                ?delay,
                "collaborator unreachable, retrying"
            ),
        }
        tokio::time::sleep(delay).await;
        retry += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(200));
        assert_eq!(policy.delay_for(1), Duration::from_millis(400));
        assert_eq!(policy.delay_for(2), Duration::from_millis(800));
    }

    #[test]
    fn huge_retry_index_saturates() {
        let policy = RetryPolicy {
            max_retries: u32::MAX,
            base_delay: Duration::from_secs(1),
        };
        assert!(policy.delay_for(1_000) >= policy.delay_for(16));
    }
}
