use std::path::PathBuf;

use crate::engine::TimeUpdate;
use crate::error::PlaybackErrorKind;

/// What a user (or the window layer on their behalf) can ask for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    OpenFolder(PathBuf),
    /// Play a master-list index.
    SelectTrack(usize),
    PlayPause,
    Stop,
    Next,
    Previous,
    SetShuffle(bool),
    SetRepeat(bool),
    SetVolume(f64),
    SetRate(f64),
    SetAudioEnabled(bool),
    SetVideoEnabled(bool),
    SeekTo(f64),
    SkipBack,
    SkipForward,
    Search(String),
    /// The user grabbed (or let go of) the position scrubber.
    SetDragging(bool),
    RegenerateThumbnail(usize),
}

/// Notifications for whoever draws the player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    TimeUpdate(TimeUpdate),
    EndOfStream,
    PlaybackError {
        kind: PlaybackErrorKind,
        message: String,
    },
    /// A burst of previews finished; redraw the gallery once.
    ThumbnailBatchReady,
    TrackChanged {
        index: usize,
        title: String,
    },
    ListExhausted,
    /// One-line human readable status.
    Status(String),
}
