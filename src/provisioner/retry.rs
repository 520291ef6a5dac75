//! Bounded-time retry for the upload-and-start step.

use crate::error::{ProvisionError, Result};
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

/// Delay between attempts unless the host overrides it.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// A retry deadline plus a fixed pause between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryWindow {
    timeout: Duration,
    delay: Duration,
}

impl RetryWindow {
    pub fn new(timeout: Duration, delay: Duration) -> Self {
        Self { timeout, delay }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Call `attempt` until it succeeds or the window closes.
    ///
    /// The first attempt always runs, even with a zero timeout. Once the
    /// deadline has passed, the last error comes back wrapped in
    /// [`ProvisionError::RetriesExhausted`].
    pub fn run<T>(&self, mut attempt: impl FnMut() -> Result<T>) -> Result<T> {
        let deadline = Instant::now() + self.timeout;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let err = match attempt() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            warn!(attempt = attempts, error = %err, "retryable error");
            if Instant::now() >= deadline {
                return Err(ProvisionError::RetriesExhausted {
                    timeout: self.timeout,
                    last: Box::new(err),
                });
            }
            thread::sleep(self.delay);
        }
    }
}
