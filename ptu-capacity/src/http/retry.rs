//! Retry policy and a retrying client decorator.
//!
//! Transient failures (timeouts, refused connections, HTTP 408/429/5xx) are
//! retried according to a [`RetryPolicy`]. Everything else is returned to
//! the caller on the first attempt.

use std::time::Duration;

use tracing::warn;

use super::client::{AsyncHttpClient, HttpError, HttpRequest, HttpResponse};

/// Default initial delay for exponential backoff (250ms).
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 250;

/// Default maximum delay for exponential backoff (10 seconds).
pub const DEFAULT_MAX_DELAY_SECS: u64 = 10;

/// Default multiplier for exponential backoff.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default number of attempts (including the first) for remote calls.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How a request handles transient failures.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
    /// No retries - fail immediately on error.
    None,

    /// Fixed number of retries with constant delay between attempts.
    Fixed {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Delay between retry attempts.
        delay: Duration,
    },

    /// Exponential backoff with configurable parameters.
    ///
    /// The delay is multiplied after each failed attempt, up to a maximum delay.
    ExponentialBackoff {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Initial delay after the first failure.
        initial_delay: Duration,
        /// Maximum delay cap (delay won't exceed this).
        max_delay: Duration,
        /// Multiplier applied to delay after each failure (typically 2.0).
        multiplier: f64,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Creates an exponential backoff policy with the default delays.
    ///
    /// A `max_attempts` of 0 or 1 disables retries.
    pub fn exponential(max_attempts: u32) -> Self {
        if max_attempts <= 1 {
            return Self::None;
        }
        Self::ExponentialBackoff {
            max_attempts,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Creates a fixed retry policy.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::Fixed {
            max_attempts,
            delay,
        }
    }

    /// Calculates the delay before retry number `attempt` (1-based).
    ///
    /// Returns `None` once the attempt budget is spent.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Fixed {
                max_attempts,
                delay,
            } => (attempt < *max_attempts).then_some(*delay),
            Self::ExponentialBackoff {
                max_attempts,
                initial_delay,
                max_delay,
                multiplier,
            } => {
                if attempt >= *max_attempts {
                    return None;
                }
                let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
                let delay_ms = initial_delay.as_millis() as f64 * factor;
                let capped = delay_ms.min(max_delay.as_millis() as f64) as u64;
                Some(Duration::from_millis(capped).min(*max_delay))
            }
        }
    }

    /// Returns the maximum number of attempts for this policy.
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Fixed { max_attempts, .. } => *max_attempts,
            Self::ExponentialBackoff { max_attempts, .. } => *max_attempts,
        }
    }
}

/// Whether an HTTP status is worth retrying.
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..600).contains(&status)
}

/// Client decorator that retries transient failures.
#[derive(Debug, Clone)]
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: AsyncHttpClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: AsyncHttpClient> AsyncHttpClient for RetryingClient<C> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut attempt = 1;
        loop {
            let outcome = self.inner.send(request.clone()).await;
            let transient = match &outcome {
                Ok(response) => is_transient_status(response.status),
                Err(e) => e.is_transient(),
            };
            if !transient {
                return outcome;
            }

            let Some(delay) = self.policy.delay_for_attempt(attempt) else {
                return outcome;
            };

            match &outcome {
                Ok(response) => warn!(
                    url = %request.url,
                    status = response.status,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Transient HTTP status, retrying"
                ),
                Err(e) => warn!(
                    url = %request.url,
                    error = %e,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Transient HTTP failure, retrying"
                ),
            }

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::client::tests::SequenceHttpClient;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_retry_policy_none() {
        let policy = RetryPolicy::None;
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.delay_for_attempt(1), None);
    }

    #[test]
    fn test_retry_policy_fixed() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(100));
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for_attempt(3), None);
    }

    #[test]
    fn test_retry_policy_exponential() {
        let policy = RetryPolicy::ExponentialBackoff {
            max_attempts: 4,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        };

        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for_attempt(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for_attempt(4), None);
    }

    #[test]
    fn test_retry_policy_exponential_respects_max_delay() {
        let policy = RetryPolicy::ExponentialBackoff {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        };

        assert_eq!(policy.delay_for_attempt(8), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_exponential_with_single_attempt_disables_retries() {
        assert_eq!(RetryPolicy::exponential(1), RetryPolicy::None);
        assert_eq!(RetryPolicy::exponential(0), RetryPolicy::None);
        assert_eq!(RetryPolicy::default().max_attempts(), DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient_status(429));
        assert!(is_transient_status(503));
        assert!(is_transient_status(408));
        assert!(!is_transient_status(404));
        assert!(!is_transient_status(200));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let inner = SequenceHttpClient::new(vec![
            Ok(HttpResponse::new(503, "busy")),
            Err(HttpError::Timeout {
                url: "u".to_string(),
            }),
            Ok(HttpResponse::new(200, "ok")),
        ]);
        let client = RetryingClient::new(inner, fast_policy(3));

        let response = client.send(HttpRequest::get("u")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(client.inner().call_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let inner = SequenceHttpClient::new(vec![
            Ok(HttpResponse::new(500, "a")),
            Ok(HttpResponse::new(500, "b")),
            Ok(HttpResponse::new(200, "never reached")),
        ]);
        let client = RetryingClient::new(inner, fast_policy(2));

        let response = client.send(HttpRequest::get("u")).await.unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(client.inner().call_count(), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let inner = SequenceHttpClient::new(vec![
            Ok(HttpResponse::new(403, "forbidden")),
            Ok(HttpResponse::new(200, "ok")),
        ]);
        let client = RetryingClient::new(inner, fast_policy(3));

        let response = client.send(HttpRequest::get("u")).await.unwrap();
        assert_eq!(response.status, 403);
        assert_eq!(client.inner().call_count(), 1);
    }
}
