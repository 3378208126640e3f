//! Attempt-bounded retry for provider calls
//!
//! Rate-limit and overload failures back off exponentially from the base
//! delay; every other failure waits the flat base delay. No delay follows
//! the final attempt, and the last error is returned unchanged.

use crate::config::GatewayConfig;
use crate::{GatewayError, GatewayResult};
use std::future::Future;
use std::time::Duration;

/// Message fragments that mark a provider failure as rate limiting
const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "quota", "overloaded"];

/// How a failed attempt is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Delay grows as `base * 2^attempt`
    RateLimited,
    /// Delay stays at `base`
    Transient,
}

impl GatewayError {
    /// Classifies this error for the retry wrapper
    ///
    /// Only provider and transport failures can be rate limits. Refusals and
    /// structural failures always use the flat delay, even when the refused
    /// text happens to mention a rate limit.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            GatewayError::Provider { status, message, .. } => {
                if matches!(status, 429 | 529) || mentions_rate_limit(message) {
                    RetryClass::RateLimited
                } else {
                    RetryClass::Transient
                }
            }
            GatewayError::Transport { source, .. } => {
                let status = source.status().map(|s| s.as_u16());
                if status == Some(429) || mentions_rate_limit(&source.to_string()) {
                    RetryClass::RateLimited
                } else {
                    RetryClass::Transient
                }
            }
            _ => RetryClass::Transient,
        }
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    let message = message.to_lowercase();
    RATE_LIMIT_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Attempt budget and base delay for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
        }
    }
}

impl From<&GatewayConfig> for RetryPolicy {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay after the failed attempt with zero-based index `attempt`
    pub fn delay_for(&self, class: RetryClass, attempt: u32) -> Duration {
        match class {
            RetryClass::RateLimited => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt)),
            RetryClass::Transient => self.base_delay,
        }
    }
}

/// Runs `operation` until it succeeds or the attempt budget is spent
///
/// # Arguments
///
/// * `policy` - Attempt budget and base delay
/// * `context` - Names the call in log lines
/// * `operation` - Produces one attempt; called once per attempt
///
/// # Returns
///
/// The first success, or the error of the final attempt.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    context: &str,
    mut operation: F,
) -> GatewayResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GatewayResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt + 1 >= attempts {
                    tracing::warn!("{} failed after {} attempts: {}", context, attempts, e);
                    return Err(e);
                }

                let class = e.retry_class();
                let delay = policy.delay_for(class, attempt);
                tracing::warn!(
                    "{}: attempt {} failed ({:?}), retrying in {:?}: {}",
                    context,
                    attempt + 1,
                    class,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn rate_limited() -> GatewayError {
        GatewayError::Provider {
            provider: "openai".to_string(),
            status: 429,
            message: "Too many requests".to_string(),
        }
    }

    fn server_error() -> GatewayError {
        GatewayError::Provider {
            provider: "openai".to_string(),
            status: 500,
            message: "Internal error".to_string(),
        }
    }

    /// Runs `with_retry` over a scripted sequence of outcomes, recording the
    /// instant of every attempt
    async fn run_script(
        script: Vec<GatewayResult<u32>>,
    ) -> (GatewayResult<u32>, Vec<Duration>) {
        let policy = RetryPolicy::new(3, Duration::from_millis(2000));
        let script = Arc::new(Mutex::new(script.into_iter()));
        let instants = Arc::new(Mutex::new(Vec::new()));

        let result = with_retry(&policy, "test call", || {
            let script = Arc::clone(&script);
            let instants = Arc::clone(&instants);
            async move {
                instants.lock().unwrap().push(Instant::now());
                script.lock().unwrap().next().unwrap_or(Ok(0))
            }
        })
        .await;

        let instants = instants.lock().unwrap().clone();
        let gaps = instants.windows(2).map(|w| w[1] - w[0]).collect();
        (result, gaps)
    }

    #[test]
    fn test_classification() {
        assert_eq!(rate_limited().retry_class(), RetryClass::RateLimited);
        assert_eq!(server_error().retry_class(), RetryClass::Transient);

        let overloaded = GatewayError::Provider {
            provider: "anthropic".to_string(),
            status: 529,
            message: "Overloaded".to_string(),
        };
        assert_eq!(overloaded.retry_class(), RetryClass::RateLimited);

        let quota = GatewayError::Provider {
            provider: "gemini".to_string(),
            status: 400,
            message: "Quota exceeded for project".to_string(),
        };
        assert_eq!(quota.retry_class(), RetryClass::RateLimited);
    }

    #[test]
    fn test_refusal_is_never_rate_limited() {
        let blocked = GatewayError::Blocked {
            excerpt: "Rate limit reached for requests".to_string(),
        };
        assert_eq!(blocked.retry_class(), RetryClass::Transient);
    }

    #[test]
    fn test_delay_growth() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(RetryClass::RateLimited, 0),
            Duration::from_millis(2000)
        );
        assert_eq!(
            policy.delay_for(RetryClass::RateLimited, 2),
            Duration::from_millis(8000)
        );
        assert_eq!(
            policy.delay_for(RetryClass::Transient, 2),
            Duration::from_millis(2000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_backs_off_exponentially() {
        let (result, gaps) = run_script(vec![Err(rate_limited()), Err(rate_limited()), Ok(7)]).await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(gaps.len(), 2);
        assert!(gaps[1] > gaps[0]);
        assert_eq!(gaps[0], Duration::from_millis(2000));
        assert_eq!(gaps[1], Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_use_flat_delay() {
        let (result, gaps) = run_script(vec![Err(server_error()), Err(server_error()), Ok(1)]).await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(gaps, vec![Duration::from_millis(2000), Duration::from_millis(2000)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_without_trailing_delay() {
        let policy = RetryPolicy::new(3, Duration::from_millis(2000));
        let calls = Arc::new(Mutex::new(0u32));
        let start = Instant::now();

        let result: GatewayResult<()> = with_retry(&policy, "test call", || {
            let calls = Arc::clone(&calls);
            async move {
                let mut calls = calls.lock().unwrap();
                *calls += 1;
                Err(GatewayError::Provider {
                    provider: "openai".to_string(),
                    status: 500,
                    message: format!("failure {}", *calls),
                })
            }
        })
        .await;

        assert_eq!(*calls.lock().unwrap(), 3);
        match result {
            Err(GatewayError::Provider { message, .. }) => assert_eq!(message, "failure 3"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(start.elapsed(), Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt_does_not_sleep() {
        let start = Instant::now();
        let (result, gaps) = run_script(vec![Ok(3)]).await;
        assert_eq!(result.unwrap(), 3);
        assert!(gaps.is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
