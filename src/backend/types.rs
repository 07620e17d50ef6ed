//! Shared backend vocabulary: profiles, capabilities and the strategy trait
//! every rendering path implements.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;

use crate::config::BackendSetting;
use crate::error::BackendError;

/// Capability profile a backend was built for, best first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BackendProfile {
    /// Host paints decoded frames directly into a native widget surface.
    Paintable,
    /// Frames are uploaded to an OpenGL-backed surface.
    GlSurface,
    /// Frames go to a legacy windowed surface.
    Windowed,
    /// Generic, auto-selected sink chosen by the host.
    AutoSink,
    /// Degraded handle: audio only, no visual surface.
    AudioOnly,
}

impl BackendProfile {
    pub fn has_surface(self) -> bool {
        !matches!(self, Self::AudioOnly)
    }
}

impl From<BackendSetting> for BackendProfile {
    fn from(s: BackendSetting) -> Self {
        match s {
            BackendSetting::Paintable => Self::Paintable,
            BackendSetting::GlSurface => Self::GlSurface,
            BackendSetting::Windowed => Self::Windowed,
            BackendSetting::AutoSink => Self::AutoSink,
        }
    }
}

impl fmt::Display for BackendProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Paintable => "paintable surface",
            Self::GlSurface => "OpenGL surface",
            Self::Windowed => "windowed surface",
            Self::AutoSink => "auto-selected sink",
            Self::AudioOnly => "audio only",
        };
        f.write_str(s)
    }
}

/// What a backend can change on a live stream without reopening it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub live_audio_toggle: bool,
    pub live_video_toggle: bool,
}

/// Which elementary streams should be rendered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StreamFlags {
    pub audio: bool,
    pub video: bool,
}

impl Default for StreamFlags {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Asynchronous notifications a backend raises off the calling stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    EndOfStream,
    Error(String),
}

/// One rendering/audio path.
///
/// Every call is expected to return promptly; work that takes time runs on
/// the backend's own threads and reports back through [`poll_event`].
///
/// [`poll_event`]: RenderingBackend::poll_event
pub trait RenderingBackend {
    fn profile(&self) -> BackendProfile;

    fn capabilities(&self) -> Capabilities;

    /// Bind `path` and prepare it paused at the start.
    fn open(&mut self, path: &Path, flags: StreamFlags) -> Result<(), BackendError>;

    fn play(&mut self) -> Result<(), BackendError>;

    fn pause(&mut self) -> Result<(), BackendError>;

    /// Release the current media. Idempotent.
    fn flush(&mut self);

    /// Flushing, accurate seek. The rate travels with the seek; there is no
    /// separate live rate property.
    fn seek(&mut self, position: Duration, rate: f64) -> Result<(), BackendError>;

    fn position(&self) -> Option<Duration>;

    fn duration(&self) -> Option<Duration>;

    /// `volume` is already clamped to `[0, 1]`.
    fn set_volume(&mut self, volume: f64);

    /// Only called when [`Capabilities::live_audio_toggle`] is set.
    fn set_audio_enabled(&mut self, enabled: bool) -> Result<(), BackendError>;

    /// Only called when [`Capabilities::live_video_toggle`] is set.
    fn set_video_enabled(&mut self, enabled: bool) -> Result<(), BackendError>;

    fn poll_event(&mut self) -> Option<BackendEvent>;
}

/// Host-owned drawing target for decoded video frames.
///
/// Implementations are called from a decoder thread and must hand the
/// frame over to their own UI thread themselves.
pub trait VideoSurface: Send + Sync {
    fn present(&self, frame: Arc<RgbaImage>);

    fn clear(&self);
}

/// Window-layer collaborator that can build a surface for a given profile.
///
/// Construction is the only reliable capability test, so a provider simply
/// fails for profiles the host cannot support.
pub trait SurfaceProvider {
    fn create_surface(
        &self,
        profile: BackendProfile,
    ) -> Result<Arc<dyn VideoSurface>, BackendError>;
}

/// Provider for hosts without any visual surface (e.g. a terminal).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSurfaces;

impl SurfaceProvider for NoSurfaces {
    fn create_surface(
        &self,
        profile: BackendProfile,
    ) -> Result<Arc<dyn VideoSurface>, BackendError> {
        Err(BackendError::Unavailable(format!(
            "host has no {profile} to draw on"
        )))
    }
}
