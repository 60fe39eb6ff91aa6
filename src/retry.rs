//! Retry utilities for source calls with exponential backoff.
//!
//! External intelligence sources fail transiently — rate limits, flaky
//! upstreams, slow WHOIS servers. The executor retries such failures with
//! exponential backoff and jitter; policies decide per source kind which
//! errors are worth retrying. Offline heuristic sources never go through
//! here.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_attempts: u32,

    /// Initial delay between retries.
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,

    /// Whether to add jitter to prevent thundering herd.
    pub jitter: bool,

    /// Maximum total time to spend retrying.
    pub max_total_duration: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
            max_total_duration: Some(Duration::from_secs(15)),
        }
    }
}

/// Policy for determining if an operation should be retried.
pub trait RetryPolicy<E> {
    /// Returns true if the operation should be retried for this error.
    fn should_retry(&self, error: &E, attempt: u32) -> bool;
}

/// Default policy for network-backed sources.
pub struct TransientRetryPolicy;

impl<E> RetryPolicy<E> for TransientRetryPolicy
where
    E: std::error::Error,
{
    fn should_retry(&self, error: &E, attempt: u32) -> bool {
        if attempt >= 3 {
            return false;
        }

        let error_str = error.to_string().to_lowercase();

        error_str.contains("timed out")
            || error_str.contains("timeout")
            || error_str.contains("connection refused")
            || error_str.contains("connection reset")
            || error_str.contains("temporary failure")
            || error_str.contains("rate limit")
            || error_str.contains("too many requests")
            || error_str.contains("service unavailable")
    }
}

/// Carrier lookup APIs rate-limit aggressively; one careful retry only.
pub struct CarrierApiRetryPolicy;

impl<E> RetryPolicy<E> for CarrierApiRetryPolicy
where
    E: std::error::Error,
{
    fn should_retry(&self, error: &E, attempt: u32) -> bool {
        if attempt >= 1 {
            return false;
        }

        let error_str = error.to_string().to_lowercase();

        error_str.contains("timed out")
            || error_str.contains("timeout")
            || error_str.contains("rate limit")
            || error_str.contains("quota")
            || error_str.contains("try again")
    }
}

/// WHOIS registries are slow and often briefly unavailable.
pub struct WhoisRetryPolicy;

impl<E> RetryPolicy<E> for WhoisRetryPolicy
where
    E: std::error::Error,
{
    fn should_retry(&self, error: &E, attempt: u32) -> bool {
        if attempt >= 2 {
            return false;
        }

        let error_str = error.to_string().to_lowercase();

        error_str.contains("timed out")
            || error_str.contains("timeout")
            || error_str.contains("connection")
            || error_str.contains("temporarily unavailable")
            || error_str.contains("try again")
    }
}

/// Retry executor that handles the retry logic.
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Execute an async operation, retrying while the policy allows.
    pub async fn execute<F, Fut, T, E, P>(&self, operation: F, policy: P) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: RetryPolicy<E>,
        E: std::error::Error,
    {
        let start_time = Instant::now();
        let mut delay = self.config.initial_delay;
        let mut last_error: Option<E> = None;

        for attempt in 0..=self.config.max_attempts {
            if let Some(max_duration) = self.config.max_total_duration
                && start_time.elapsed() >= max_duration
            {
                break;
            }

            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if attempt >= self.config.max_attempts || !policy.should_retry(&error, attempt)
                    {
                        return Err(error);
                    }
                    last_error = Some(error);

                    let actual_delay = if self.config.jitter {
                        add_jitter(delay)
                    } else {
                        delay
                    };
                    sleep(actual_delay).await;

                    delay = std::cmp::min(
                        Duration::from_millis(
                            (delay.as_millis() as f64 * self.config.backoff_multiplier) as u64,
                        ),
                        self.config.max_delay,
                    );
                }
            }
        }

        // Total-duration cutoff hit between attempts.
        match last_error {
            Some(e) => Err(e),
            None => operation().await,
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::with_default_config()
    }
}

/// Add random jitter to prevent thundering herd problems.
fn add_jitter(delay: Duration) -> Duration {
    use rand::Rng;

    let jitter_range = delay.as_millis() as f64 * 0.1; // 10% jitter
    let mut rng = rand::rng();
    let jitter: f64 = rng.random_range(-jitter_range..=jitter_range);

    let jittered_ms = (delay.as_millis() as f64 + jitter).max(0.0) as u64;
    Duration::from_millis(jittered_ms)
}
