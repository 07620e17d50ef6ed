//! Error types shared by the playback core.
//!
//! `PlayerError` is what the engine and navigator return to callers,
//! `BackendError` is what a rendering backend reports to the engine and
//! `ThumbnailError` travels from the worker pool back to the control thread
//! as data inside a completion message.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Coarse error class handed to `on_playback_error` consumers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlaybackErrorKind {
    BackendUnavailable,
    NotFound,
    InvalidInput,
    PipelineFailure,
}

impl fmt::Display for PlaybackErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BackendUnavailable => "backend unavailable",
            Self::NotFound => "not found",
            Self::InvalidInput => "invalid input",
            Self::PipelineFailure => "pipeline failure",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("no usable playback backend: {0}")]
    BackendUnavailable(String),
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("nothing is loaded")]
    NothingLoaded,
    #[error("playback position is not known yet")]
    PositionUnknown,
    #[error("pipeline failure: {0}")]
    Pipeline(String),
    #[error("reload failed ({}): {message}", reload_outcome(.reverted))]
    ReloadFailed { reverted: bool, message: String },
}

impl PlayerError {
    /// Map onto the collaborator-facing error class.
    pub fn kind(&self) -> PlaybackErrorKind {
        match self {
            Self::BackendUnavailable(_) => PlaybackErrorKind::BackendUnavailable,
            Self::NotFound(_) => PlaybackErrorKind::NotFound,
            Self::InvalidInput(_) | Self::NothingLoaded | Self::PositionUnknown => {
                PlaybackErrorKind::InvalidInput
            }
            Self::Pipeline(_) | Self::ReloadFailed { .. } => PlaybackErrorKind::PipelineFailure,
        }
    }
}

fn reload_outcome(reverted: &bool) -> &'static str {
    if *reverted {
        "previous settings restored"
    } else {
        "playback stopped"
    }
}

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("backend cannot be initialised: {0}")]
    Unavailable(String),
    #[error("cannot open media: {0}")]
    Open(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<BackendError> for PlayerError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unavailable(msg) => Self::BackendUnavailable(msg),
            BackendError::Open(msg) | BackendError::Transport(msg) => Self::Pipeline(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThumbnailError {
    #[error("cannot open media: {0}")]
    Open(String),
    #[error("no video stream")]
    NoVideoStream,
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("{0}")]
    Unsupported(String),
}
