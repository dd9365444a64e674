//! Explicit debounce timer.
//!
//! The timer has two states. While **idle** there is no deadline. The first
//! signal arms a deadline `window` in the future; further signals push the
//! deadline out again without scheduling anything extra. Once the deadline has
//! passed, [`Debouncer::fire`] returns to idle and reports that the coalesced
//! action should run.
//!
//! The timer never reads a clock itself. Callers pass the current instant, which
//! keeps the state machine deterministic under test.

use std::time::Duration;
use tokio::time::Instant;

/// Arm/reset/fire debounce state machine.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Create an idle debouncer with the given quiet window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Record a signal at `now`.
    ///
    /// Returns `true` if this signal armed an idle timer and `false` if it
    /// reset an already scheduled one.
    pub fn signal(&mut self, now: Instant) -> bool {
        let armed = self.deadline.is_none();
        self.deadline = Some(now + self.window);
        armed
    }

    /// The pending deadline, if a run is scheduled.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a run is scheduled.
    pub fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fire the timer if its deadline has passed at `now`.
    ///
    /// Returns `true` exactly once per scheduled run.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
