use std::path::Path;
use std::time::Duration;

use crate::error::BackendError;

use super::types::{BackendEvent, BackendProfile, Capabilities, RenderingBackend, StreamFlags};

/// Stand-in used when negotiation found nothing at all. Opening, playing
/// and seeking report the backend as unavailable; the rest does nothing.
#[derive(Debug, Clone)]
pub struct DisabledBackend {
    reason: String,
}

impl DisabledBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl RenderingBackend for DisabledBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile::AudioOnly
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            live_audio_toggle: true,
            live_video_toggle: true,
        }
    }

    fn open(&mut self, _path: &Path, _flags: StreamFlags) -> Result<(), BackendError> {
        Err(BackendError::Unavailable(self.reason.clone()))
    }

    fn play(&mut self) -> Result<(), BackendError> {
        Err(BackendError::Unavailable(self.reason.clone()))
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn flush(&mut self) {}

    fn seek(&mut self, _position: Duration, _rate: f64) -> Result<(), BackendError> {
        Err(BackendError::Unavailable(self.reason.clone()))
    }

    fn position(&self) -> Option<Duration> {
        None
    }

    fn duration(&self) -> Option<Duration> {
        None
    }

    fn set_volume(&mut self, _volume: f64) {}

    fn set_audio_enabled(&mut self, _enabled: bool) -> Result<(), BackendError> {
        Ok(())
    }

    fn set_video_enabled(&mut self, _enabled: bool) -> Result<(), BackendError> {
        Ok(())
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        None
    }
}
