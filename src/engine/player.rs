use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};

use crate::backend::{BackendEvent, BackendProfile, RenderingBackend, StreamFlags};
use crate::config::PlaybackSettings;
use crate::error::PlayerError;

use super::types::{EngineEvent, EngineState, Rate, Volume};

/// Transport state machine over one rendering backend.
///
/// Lives on the control thread. Volume, rate and the audio/video flags are
/// engine settings that survive track changes: every load reapplies them.
pub struct PlaybackEngine {
    backend: Box<dyn RenderingBackend>,
    state: EngineState,
    path: Option<PathBuf>,
    volume: Volume,
    rate: Rate,
    flags: StreamFlags,
}

impl PlaybackEngine {
    pub fn new(backend: Box<dyn RenderingBackend>) -> Self {
        Self {
            backend,
            state: EngineState::Idle,
            path: None,
            volume: Volume::default(),
            rate: Rate::default(),
            flags: StreamFlags::default(),
        }
    }

    /// Start from the stored session values instead of the built-in defaults.
    pub fn with_settings(backend: Box<dyn RenderingBackend>, settings: &PlaybackSettings) -> Self {
        let mut engine = Self::new(backend);
        engine.volume = Volume::new(settings.volume);
        engine.rate = Rate::new(settings.rate);
        engine.flags = StreamFlags {
            audio: settings.audio_enabled,
            video: settings.video_enabled,
        };
        engine.backend.set_volume(engine.volume.value());
        engine
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn profile(&self) -> BackendProfile {
        self.backend.profile()
    }

    pub fn volume(&self) -> f64 {
        self.volume.value()
    }

    pub fn rate(&self) -> f64 {
        self.rate.value()
    }

    pub fn audio_enabled(&self) -> bool {
        self.flags.audio
    }

    pub fn video_enabled(&self) -> bool {
        self.flags.video
    }

    /// Bind `path`, passing through `Idle` first.
    ///
    /// The path is checked before anything is torn down, so a bad path leaves
    /// whatever is playing untouched.
    pub fn load(&mut self, path: &Path) -> Result<(), PlayerError> {
        if path.as_os_str().is_empty() {
            return Err(PlayerError::InvalidInput("empty path".to_string()));
        }
        if !path.exists() {
            return Err(PlayerError::NotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(PlayerError::InvalidInput(format!(
                "{} is not a file",
                path.display()
            )));
        }

        self.stop();
        self.bind(path, Duration::ZERO, self.rate.value())?;
        self.state = EngineState::Loaded;
        self.path = Some(path.to_path_buf());
        info!("engine: loaded {}", path.display());
        Ok(())
    }

    /// Open `path` on an already-idle backend and reapply volume and rate.
    /// Events left over from the previous stream are discarded first so a
    /// stale end-of-stream cannot be attributed to the new one.
    fn bind(&mut self, path: &Path, at: Duration, rate: f64) -> Result<(), PlayerError> {
        let mut stale = 0usize;
        while self.backend.poll_event().is_some() {
            stale += 1;
        }
        if stale > 0 {
            debug!("engine: dropped {stale} stale backend event(s)");
        }

        self.backend.open(path, self.flags)?;
        self.backend.set_volume(self.volume.value());
        if at > Duration::ZERO || rate != 1.0 {
            if let Err(e) = self.backend.seek(at, rate) {
                self.backend.flush();
                return Err(e.into());
            }
        }
        Ok(())
    }

    pub fn play(&mut self) -> Result<(), PlayerError> {
        match self.state {
            EngineState::Idle => Err(PlayerError::NothingLoaded),
            EngineState::Playing => Ok(()),
            EngineState::Loaded | EngineState::Paused => {
                self.backend.play()?;
                self.state = EngineState::Playing;
                debug!("engine: playing");
                Ok(())
            }
        }
    }

    pub fn pause(&mut self) -> Result<(), PlayerError> {
        if self.state != EngineState::Playing {
            return Ok(());
        }
        self.backend.pause()?;
        self.state = EngineState::Paused;
        debug!("engine: paused");
        Ok(())
    }

    /// Back to `Idle` from anywhere. Safe to call repeatedly and during teardown.
    pub fn stop(&mut self) {
        self.backend.flush();
        if self.state != EngineState::Idle {
            debug!("engine: stopped");
        }
        self.state = EngineState::Idle;
        self.path = None;
    }

    /// Accurate seek to `seconds`, clamped to `[0, duration]` when the
    /// duration is known (NaN counts as 0).
    pub fn seek_to(&mut self, seconds: f64) -> Result<(), PlayerError> {
        if !self.state.is_loaded() {
            return Err(PlayerError::NothingLoaded);
        }
        let duration = self.query_duration();
        let target = if seconds.is_nan() {
            0.0
        } else {
            let upper = duration.unwrap_or(f64::INFINITY);
            seconds.clamp(0.0, upper)
        };
        let at = Duration::try_from_secs_f64(target).map_err(|_| {
            PlayerError::InvalidInput(format!("cannot seek to {seconds} seconds"))
        })?;
        self.backend.seek(at, self.rate.value())?;
        Ok(())
    }

    pub fn seek_relative(&mut self, delta_seconds: f64) -> Result<(), PlayerError> {
        if !self.state.is_loaded() {
            return Err(PlayerError::NothingLoaded);
        }
        let pos = self.query_position().ok_or(PlayerError::PositionUnknown)?;
        self.seek_to(pos + delta_seconds)
    }

    /// Clamp and apply a new rate. The rate only takes effect through a
    /// seek, so a loaded stream is re-seeked at its current position.
    pub fn set_rate(&mut self, rate: f64) -> Result<f64, PlayerError> {
        let rate = Rate::new(rate);
        self.rate = rate;
        if self.state.is_loaded() {
            let at = self.backend.position().unwrap_or(Duration::ZERO);
            self.backend.seek(at, rate.value())?;
            debug!("engine: rate {} at {at:?}", rate.value());
        }
        Ok(rate.value())
    }

    /// Returns the clamped value actually applied.
    pub fn set_volume(&mut self, volume: f64) -> f64 {
        self.volume = Volume::new(volume);
        self.backend.set_volume(self.volume.value());
        self.volume.value()
    }

    pub fn set_audio_enabled(&mut self, enabled: bool) -> Result<(), PlayerError> {
        if self.flags.audio == enabled {
            return Ok(());
        }
        let previous = self.flags;
        self.flags.audio = enabled;
        if !self.state.is_loaded() {
            return Ok(());
        }
        if self.backend.capabilities().live_audio_toggle {
            if let Err(e) = self.backend.set_audio_enabled(enabled) {
                self.flags = previous;
                return Err(e.into());
            }
            return Ok(());
        }
        self.reload_in_place(previous)
    }

    pub fn set_video_enabled(&mut self, enabled: bool) -> Result<(), PlayerError> {
        if self.flags.video == enabled {
            return Ok(());
        }
        let previous = self.flags;
        self.flags.video = enabled;
        if !self.state.is_loaded() {
            return Ok(());
        }
        if self.backend.capabilities().live_video_toggle {
            if let Err(e) = self.backend.set_video_enabled(enabled) {
                self.flags = previous;
                return Err(e.into());
            }
            return Ok(());
        }
        self.reload_in_place(previous)
    }

    /// Reopen the current path with the new flags, keeping position and the
    /// playing/paused state. On failure the previous flags are restored and
    /// reopened; if even that fails the engine ends up `Idle`.
    fn reload_in_place(&mut self, previous: StreamFlags) -> Result<(), PlayerError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let at = self.backend.position().unwrap_or(Duration::ZERO);
        let resume = self.state;
        info!(
            "engine: reloading {} at {at:?} (audio {}, video {})",
            path.display(),
            self.flags.audio,
            self.flags.video
        );

        let err = match self.reopen(&path, at, resume) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        warn!("engine: reload failed ({err}); restoring previous stream flags");
        self.flags = previous;
        match self.reopen(&path, at, resume) {
            Ok(()) => Err(PlayerError::ReloadFailed {
                reverted: true,
                message: err.to_string(),
            }),
            Err(again) => {
                self.stop();
                Err(PlayerError::ReloadFailed {
                    reverted: false,
                    message: format!("{err}; restoring also failed: {again}"),
                })
            }
        }
    }

    fn reopen(&mut self, path: &Path, at: Duration, resume: EngineState) -> Result<(), PlayerError> {
        self.backend.flush();
        self.state = EngineState::Idle;
        self.bind(path, at, self.rate.value())?;
        self.state = EngineState::Loaded;
        if resume == EngineState::Playing {
            self.backend.play()?;
        }
        self.state = resume;
        Ok(())
    }

    /// Position in seconds, `None` until the backend knows it.
    pub fn query_position(&self) -> Option<f64> {
        if !self.state.is_loaded() {
            return None;
        }
        self.backend.position().map(|d| d.as_secs_f64())
    }

    pub fn query_duration(&self) -> Option<f64> {
        if !self.state.is_loaded() {
            return None;
        }
        self.backend.duration().map(|d| d.as_secs_f64())
    }

    /// Next pending asynchronous event, if any.
    pub fn poll_event(&mut self) -> Option<EngineEvent> {
        if !self.state.is_loaded() {
            // Nothing is bound, so anything queued belongs to a flushed stream.
            while self.backend.poll_event().is_some() {}
            return None;
        }
        match self.backend.poll_event()? {
            BackendEvent::EndOfStream => {
                debug!("engine: end of stream");
                Some(EngineEvent::EndOfStream)
            }
            BackendEvent::Error(msg) => {
                warn!("engine: pipeline failure: {msg}");
                self.stop();
                Some(EngineEvent::Error(PlayerError::Pipeline(msg)))
            }
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
