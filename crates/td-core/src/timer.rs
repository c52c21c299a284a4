//! Throttling and cancelable deferred actions
//!
//! Both are polled with an explicit instant. Nothing here spawns threads:
//! a deferred action fires when its owner polls it after the deadline.

use std::time::{Duration, Instant};

/// Admits at most one call per interval; the rest are dropped
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_run: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check whether a call may run now, recording it if so
    pub fn should_run(&mut self, now: Instant) -> bool {
        match self.last_run {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_run = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_run = None;
    }
}

/// A one-shot timer that can be re-armed or cancelled before it fires
#[derive(Debug, Clone)]
pub struct DeferredAction {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DeferredAction {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Start (or restart) the countdown from `now`
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drop the pending action; returns whether one was pending
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the action if its deadline has passed
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
