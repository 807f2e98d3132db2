// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fixed-interval pacing for outbound calls during ingestion

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::sync::Arc;
use std::time::Duration;

/// Lets one call through per `interval`; a zero interval disables pacing
pub struct Pacer {
    limiter: Option<Arc<GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    interval: Duration,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        let limiter =
            Quota::with_period(interval).map(|quota| Arc::new(GovRateLimiter::direct(quota)));
        Self { limiter, interval }
    }

    /// Wait until the next call is allowed
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }
}
