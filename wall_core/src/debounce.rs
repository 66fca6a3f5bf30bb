//! Coalesces bursts of parameter changes into a single recomputation.
//!
//! The caller owns the clock: every method takes `now`, so the debouncer
//! works with a real event loop and with fixed instants in tests alike.

use std::time::{Duration, Instant};

/// Quiet period before a staged change is applied
pub const DEFAULT_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer { delay, deadline: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm (or re-arm) the timer; a newer trigger supersedes a pending one.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// Returns `true` exactly once per burst, when the quiet period has elapsed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Debouncer::new(DEFAULT_DELAY)
    }
}
