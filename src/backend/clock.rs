use std::time::{Duration, Instant};

/// Wall-clock media timeline: an anchor position plus the instant playback
/// resumed from it, advanced at `rate`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    anchor: Duration,
    resumed_at: Option<Instant>,
    rate: f64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            anchor: Duration::ZERO,
            resumed_at: None,
            rate: 1.0,
        }
    }
}

impl PlaybackClock {
    pub fn is_running(&self) -> bool {
        self.resumed_at.is_some()
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn position_at(&self, now: Instant) -> Duration {
        match self.resumed_at {
            Some(t0) => {
                let elapsed = now.saturating_duration_since(t0).as_secs_f64() * self.rate;
                self.anchor + Duration::from_secs_f64(elapsed)
            }
            None => self.anchor,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(now);
        }
    }

    pub fn pause(&mut self, now: Instant) {
        self.anchor = self.position_at(now);
        self.resumed_at = None;
    }

    /// Jump to `position` and continue at `rate`, keeping the running state.
    pub fn seek(&mut self, position: Duration, rate: f64, now: Instant) {
        self.anchor = position;
        self.rate = rate;
        if self.resumed_at.is_some() {
            self.resumed_at = Some(now);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
