use std::time::{Duration, Instant};

use log::trace;

/// Coalesces a burst of signals into one, fired after a quiet period.
///
/// Every [`schedule`](Self::schedule) pushes the deadline out again, so
/// [`tick`](Self::tick) only reports once nothing new has arrived for the
/// whole window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    due: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, due: None }
    }

    /// Arm, or re-arm, the timer.
    pub fn schedule(&mut self, now: Instant) {
        self.due = Some(now + self.quiet);
    }

    pub fn cancel(&mut self) {
        if self.due.take().is_some() {
            trace!("debounce: cancelled");
        }
    }

    /// `true` exactly once per burst, when the quiet window has elapsed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(200);

    #[test]
    fn nothing_fires_without_a_schedule() {
        let mut d = Debouncer::new(QUIET);
        assert!(!d.tick(Instant::now() + Duration::from_secs(10)));
    }

    #[test]
    fn fires_once_after_the_quiet_window() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(QUIET);
        d.schedule(t0);

        assert!(!d.tick(t0 + Duration::from_millis(199)));
        assert!(d.tick(t0 + QUIET));
        assert!(!d.tick(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn rescheduling_pushes_the_deadline_out() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(QUIET);
        for ms in (0..1000).step_by(50) {
            d.schedule(t0 + Duration::from_millis(ms));
            assert!(!d.tick(t0 + Duration::from_millis(ms)));
        }
        assert!(!d.tick(t0 + Duration::from_millis(1149)));
        assert!(d.tick(t0 + Duration::from_millis(1150)));
    }

    #[test]
    fn cancel_disarms() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(QUIET);
        d.schedule(t0);
        d.cancel();
        assert!(!d.tick(t0 + QUIET));
    }
}
