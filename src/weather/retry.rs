//! Exponential backoff around the network step of a weather request.

use crate::weather::error::{TransportError, WeatherError};
use bon::Builder;
use log::warn;
use std::future::Future;
use std::time::Duration;

/// Retry schedule: the delay before attempt `k + 1` is
/// `min(max_delay, initial_delay * 2^(k - 1))`.
///
/// # Examples
///
/// ```
/// use energy_forecast::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder().max_attempts(3).build();
/// assert_eq!(policy.delay_after(1), Duration::from_secs(1));
/// assert_eq!(policy.delay_after(2), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct RetryPolicy {
    #[builder(default = 5)]
    max_attempts: u32,
    #[builder(default = Duration::from_secs(1))]
    initial_delay: Duration,
    #[builder(default = Duration::from_secs(30))]
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Total attempts, never less than one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Runs `attempt` until it succeeds or the attempts are used up.
    ///
    /// # Errors
    ///
    /// [`WeatherError::Fetch`] with the last transport failure once every
    /// attempt has failed.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, WeatherError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let max_attempts = self.max_attempts();
        let mut tried = 0;
        loop {
            tried += 1;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(source) if tried >= max_attempts => {
                    return Err(WeatherError::Fetch {
                        operation: operation.to_string(),
                        attempts: tried,
                        source,
                    });
                }
                Err(e) => {
                    let delay = self.delay_after(tried);
                    warn!(
                        "{} attempt {}/{} failed: {}; retrying in {:?}",
                        operation, tried, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn unavailable() -> TransportError {
        TransportError::HttpStatus {
            url: "http://weather.test/archive".to_string(),
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    #[test]
    fn test_delays_double_and_cap() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=7).map(|k| policy.delay_after(k).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_then_fetch_error() {
        let policy = RetryPolicy::default();
        let mut calls = Vec::new();

        let result: Result<(), WeatherError> = policy
            .run("historical", || {
                calls.push(Instant::now());
                async { Err(unavailable()) }
            })
            .await;

        match result {
            Err(WeatherError::Fetch {
                attempts, source, ..
            }) => {
                assert_eq!(attempts, 5);
                assert!(matches!(source, TransportError::HttpStatus { .. }));
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
        let gaps: Vec<u64> = calls
            .windows(2)
            .map(|w| (w[1] - w[0]).as_secs())
            .collect();
        assert_eq!(gaps, vec![1, 2, 4, 8]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failures() -> Result<(), WeatherError> {
        let policy = RetryPolicy::default();
        let started = Instant::now();
        let mut remaining_failures = 2;

        let value = policy
            .run("geocode", || {
                let fail = remaining_failures > 0;
                remaining_failures -= 1;
                async move {
                    if fail {
                        Err(unavailable())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await?;

        assert_eq!(value, 42);
        assert_eq!(started.elapsed().as_secs(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_single_attempt_policy_does_not_sleep() {
        let policy = RetryPolicy::builder().max_attempts(1).build();
        let result: Result<(), WeatherError> = policy.run("forecast", || async { Err(unavailable()) }).await;
        assert!(matches!(result, Err(WeatherError::Fetch { attempts: 1, .. })));
    }
}
