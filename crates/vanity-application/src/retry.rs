//! Bounded retry for store calls.

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use vanity_core::config::PersistSettings;
use vanity_core::{Result, VanityError};

/// Exponential backoff with a fixed attempt budget and a per-attempt timeout.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &PersistSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            attempt_timeout: settings.store_timeout(),
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. Attempts that outlive the timeout count as
    /// store failures.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.backoff();
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(VanityError::store(format!(
                    "{} timed out after {:?}",
                    what, self.attempt_timeout
                ))),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = backoff.next_backoff().unwrap_or(self.max_backoff);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {} (retrying in {:?})",
                        what,
                        attempt,
                        self.max_attempts,
                        err,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&PersistSettings::default())
    }
}
