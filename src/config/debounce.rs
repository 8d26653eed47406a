//! Single-slot delayed action owned by the control thread
//!
//! Arming replaces any previously scheduled deadline, so a burst of triggers
//! fires once, `delay` after the last one. The owner polls `fire_if_due`
//! from its own loop; nothing here runs on another thread.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Schedule (or reschedule) the action `delay` after `now`
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Time left until the deadline, if armed
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Returns true exactly once per armed deadline, when `now` reaches it
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_due_before_delay() {
        let mut debounce = Debounce::new(Duration::from_millis(500));
        let start = Instant::now();
        debounce.arm(start);
        assert!(!debounce.fire_if_due(start + Duration::from_millis(499)));
        assert_eq!(
            debounce.remaining(start + Duration::from_millis(499)),
            Some(Duration::from_millis(1))
        );
    }

    #[test]
    fn test_fires_once() {
        let mut debounce = Debounce::new(Duration::from_millis(500));
        let start = Instant::now();
        debounce.arm(start);
        assert!(debounce.fire_if_due(start + Duration::from_millis(500)));
        assert!(!debounce.fire_if_due(start + Duration::from_millis(900)));
    }

    #[test]
    fn test_rearm_pushes_deadline() {
        let mut debounce = Debounce::new(Duration::from_millis(500));
        let start = Instant::now();
        debounce.arm(start);
        debounce.arm(start + Duration::from_millis(400));
        assert!(!debounce.fire_if_due(start + Duration::from_millis(600)));
        assert_eq!(
            debounce.remaining(start + Duration::from_millis(600)),
            Some(Duration::from_millis(300))
        );
        assert!(debounce.fire_if_due(start + Duration::from_millis(900)));
    }

    #[test]
    fn test_cancel() {
        let mut debounce = Debounce::new(Duration::from_millis(10));
        let start = Instant::now();
        debounce.arm(start);
        debounce.cancel();
        assert!(!debounce.fire_if_due(start + Duration::from_secs(1)));
    }
}
