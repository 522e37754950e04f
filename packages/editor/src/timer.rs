//! # Deferred Work
//!
//! The session never blocks. Work that must wait (snapshot capture, autosave,
//! the replay guard) is represented as a [`Debouncer`] holding at most one
//! deadline, and the host calls `EditingSession::poll` when a deadline passes.
//!
//! Time comes from an injected [`Clock`] so tests can step it by hand.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of the current time
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock; clones share the same time
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// A single re-armable deadline
///
/// Arming an already-armed debouncer pushes the deadline out, so at most one
/// firing is ever pending.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has passed
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_due_immediately() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        debouncer.arm(clock.now());
        assert!(!debouncer.take_due(clock.now()));
        assert!(debouncer.is_pending());
    }

    #[test]
    fn test_due_after_delay() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        debouncer.arm(clock.now());
        clock.advance_ms(100);
        assert!(debouncer.take_due(clock.now()));
        assert!(!debouncer.is_pending());
        assert!(!debouncer.take_due(clock.now()));
    }

    #[test]
    fn test_rearm_pushes_deadline() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        debouncer.arm(clock.now());
        clock.advance_ms(50);
        debouncer.arm(clock.now());
        clock.advance_ms(50);
        assert!(!debouncer.take_due(clock.now()), "timer was reset");

        clock.advance_ms(50);
        assert!(debouncer.take_due(clock.now()));
    }

    #[test]
    fn test_cancel_drops_deadline() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.arm(clock.now());
        debouncer.cancel();
        clock.advance_ms(20);
        assert!(!debouncer.take_due(clock.now()));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let before = other.now();
        clock.advance_ms(5);
        assert_eq!(other.now() - before, Duration::from_millis(5));
    }
}
