//! Small engine types: the transport state, clamped volume/rate values and
//! the events the engine hands to its owner.

use crate::error::PlayerError;

pub const MIN_VOLUME: f64 = 0.0;
pub const MAX_VOLUME: f64 = 1.0;
pub const MIN_RATE: f64 = 0.25;
pub const MAX_RATE: f64 = 4.0;

/// Output volume, always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume(f64);

impl Volume {
    /// Clamp into range. NaN counts as silence.
    #[must_use]
    pub fn new(volume: f64) -> Self {
        if volume.is_nan() {
            return Self(MIN_VOLUME);
        }
        Self(volume.clamp(MIN_VOLUME, MAX_VOLUME))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(0.8)
    }
}

/// Playback rate, always within `[0.25, 4.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate(f64);

impl Rate {
    /// Clamp into range. NaN falls back to normal speed.
    #[must_use]
    pub fn new(rate: f64) -> Self {
        if rate.is_nan() {
            return Self::default();
        }
        Self(rate.clamp(MIN_RATE, MAX_RATE))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self(1.0)
    }
}

/// `Idle -> Loaded -> Playing <-> Paused -> Idle`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Loaded,
    Playing,
    Paused,
}

impl EngineState {
    pub fn is_loaded(self) -> bool {
        self != Self::Idle
    }
}

/// Asynchronous engine notifications, delivered by polling.
#[derive(Debug)]
pub enum EngineEvent {
    EndOfStream,
    /// The pipeline died mid-playback; the engine is back to `Idle`.
    Error(PlayerError),
}
