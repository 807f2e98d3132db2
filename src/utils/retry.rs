// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bounded retry with backoff and a per-attempt timeout
//!
//! Every outbound call goes through [`RetryPolicy::run`]. Functional
//! behaviour does not change with retries (callers still degrade or fall
//! back on error), but the logs separate a call that failed once from one
//! that failed persistently.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::config::HttpConfig;

/// Errors that can be classified for retry purposes
pub trait RetryableError: std::fmt::Display {
    /// Whether another attempt could succeed
    fn is_retryable(&self) -> bool;

    /// Error value representing an attempt that exceeded its timeout
    fn timed_out(timeout_ms: u64) -> Self;
}

/// Retry policy for external calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further retry
    pub initial_backoff: Duration,
    /// Upper bound for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.retry_backoff_ms),
            attempt_timeout: config.timeout(),
        }
    }

    /// Policy with no retries, used where the caller already paces itself
    pub fn no_retry(attempt_timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            attempt_timeout,
        }
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or
    /// the retry budget is spent
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError,
    {
        let mut attempt: u32 = 0;
        let mut delay = self.initial_backoff;

        loop {
            let outcome = match timeout(self.attempt_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out(self.attempt_timeout.as_millis() as u64)),
            };

            match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        info!("{} succeeded after {} retries", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {}ms",
                        operation,
                        attempt,
                        self.max_retries + 1,
                        e,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => {
                    if attempt > 0 {
                        warn!(
                            "{} failed persistently after {} attempts: {}",
                            operation,
                            attempt + 1,
                            e
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}
