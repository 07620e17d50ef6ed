use std::time::{Duration, Instant};

use super::player::PlaybackEngine;

/// One sampled time update.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeUpdate {
    /// `None` while the user is scrubbing, so the scrubber is not overwritten.
    pub position: Option<f64>,
    pub duration: f64,
    /// `mm:ss / mm:ss`
    pub label: String,
}

/// Fixed-interval position sampler, driven by the control loop.
///
/// Runs only between `start` (a track was loaded) and `stop`. Each due
/// `poll` samples the engine once and yields an update when both position
/// and a positive duration are known.
#[derive(Debug)]
pub struct PositionTicker {
    interval: Duration,
    next_due: Option<Instant>,
    dragging: bool,
}

impl PositionTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_due: None,
            dragging: false,
        }
    }

    /// Arm the timer; the first sample is due immediately.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    pub fn poll(&mut self, now: Instant, engine: &PlaybackEngine) -> Option<TimeUpdate> {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        // Missed ticks are not replayed.
        self.next_due = Some(now + self.interval);
        self.sample(engine)
    }

    fn sample(&self, engine: &PlaybackEngine) -> Option<TimeUpdate> {
        let position = engine.query_position()?;
        let duration = engine.query_duration()?;
        if !(duration > 0.0) {
            return None;
        }
        Some(TimeUpdate {
            position: (!self.dragging).then_some(position),
            duration,
            label: format_label(position, duration),
        })
    }
}

/// `mm:ss`, rounded to the nearest second. Minutes are not wrapped into hours.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        (seconds + 0.5).floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

pub fn format_label(position: f64, duration: f64) -> String {
    format!("{} / {}", format_clock(position), format_clock(duration))
}
