// src/control/rate_limiter.rs
//! Interval gate for periodic outbound calls (heartbeat, queue poll).
//! Each gate keeps its own timestamp, so gates never starve each other.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    last: Option<Instant>,
    pub interval: Duration,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self { last: None, interval }
    }

    /// True if the gate has never fired or `interval` has passed since it last did.
    pub fn ready(&self) -> bool {
        match self.last {
            None => true,
            Some(ts) => ts.elapsed() >= self.interval,
        }
    }

    pub fn mark(&mut self) {
        self.last = Some(Instant::now());
    }

    /// Returns true and records the attempt if the gate is open.
    pub fn check_and_mark(&mut self) -> bool {
        if self.ready() {
            self.mark();
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
