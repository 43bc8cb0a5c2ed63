use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,
    /// Initial delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles the delay each time)
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Create a new retry configuration; zero attempts is raised to one.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }

    /// Set the maximum delay between retries
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Preset: database reads (3 attempts)
    /// Delays: 200ms, 400ms
    pub fn database_read() -> Self {
        Self::new(3, Duration::from_millis(200)).with_max_delay(Duration::from_secs(2))
    }

    /// No retries at all, a single attempt
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Calculate the delay for a given attempt number (0-indexed)
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::database_read()
    }
}

/// Execute an async operation with retries while `should_retry` approves the error.
///
/// Returns the first success, the first non-retryable error, or the last
/// error once attempts run out.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let delay = config.delay_for_attempt(attempt);
        if !delay.is_zero() {
            debug!(
                "{}: Retry attempt {}/{} after {:?}",
                operation_name,
                attempt + 1,
                max_attempts,
                delay
            );
            sleep(delay).await;
        }

        let err = match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "{}: Succeeded on attempt {}/{}",
                        operation_name,
                        attempt + 1,
                        max_attempts
                    );
                }
                return Ok(result);
            }
            Err(e) => e,
        };

        if !should_retry(&err) {
            debug!("{}: Not retrying error: {}", operation_name, err);
            return Err(err);
        }

        attempt += 1;
        if attempt >= max_attempts {
            warn!(
                "{}: All {} attempts failed. Last error: {}",
                operation_name, max_attempts, err
            );
            return Err(err);
        }

        warn!(
            "{}: Attempt {}/{} failed ({}), {} retries remaining",
            operation_name,
            attempt,
            max_attempts,
            err,
            max_attempts - attempt
        );
    }
}
