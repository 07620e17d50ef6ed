use crate::config::PlaybackSettings;
use crate::engine::{Rate, Volume};

/// Everything the user can toggle about the current listening session.
///
/// Owned by the navigator and only changed on the control thread. Volume and
/// rate are stored already clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    /// Index into the master list.
    pub current: Option<usize>,
    pub playing: bool,
    pub volume: f64,
    pub rate: f64,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub shuffle: bool,
    pub repeat: bool,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::from_settings(&PlaybackSettings::default())
    }
}

impl PlaybackSession {
    pub fn from_settings(settings: &PlaybackSettings) -> Self {
        Self {
            current: None,
            playing: false,
            volume: Volume::new(settings.volume).value(),
            rate: Rate::new(settings.rate).value(),
            audio_enabled: settings.audio_enabled,
            video_enabled: settings.video_enabled,
            shuffle: settings.shuffle,
            repeat: settings.repeat,
        }
    }
}
