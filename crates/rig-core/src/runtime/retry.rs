//! Bounded retries for read-only runtime queries.

use std::thread;
use std::time::Duration;

use rig_config::Config;
use tracing::warn;

use super::RuntimeError;

const RETRY_TARGET: &str = "rig_core::runtime::retry";
const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// How often, and how patiently, transient query failures are retried.
///
/// Only read-only queries go through a policy. Mutating calls are issued
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Policy making `attempts` tries (at least one) spaced by `delay`.
    #[must_use]
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// Policy making a single attempt.
    #[must_use]
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Policy derived from the configured attempt budget.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.runtime_attempts(), DEFAULT_DELAY)
    }

    /// Maximum number of attempts.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Runs `query`, retrying while it fails transiently.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error, or the last transient one once the
    /// attempt budget is spent.
    pub fn run<T>(
        &self,
        operation: &str,
        mut query: impl FnMut() -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let mut attempt = 1;
        loop {
            match query() {
                Err(error) if error.is_transient() && attempt < self.attempts => {
                    warn!(
                        target: RETRY_TARGET,
                        operation,
                        attempt,
                        attempts = self.attempts,
                        %error,
                        "transient runtime failure, retrying"
                    );
                    attempt += 1;
                    thread::sleep(self.delay);
                }
                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(rig_config::DEFAULT_RUNTIME_RETRIES, DEFAULT_DELAY)
    }
}
