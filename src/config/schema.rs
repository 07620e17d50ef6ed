use serde::{Deserialize, Serialize};

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/cadenza/config.toml` or `~/.config/cadenza/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `CADENZA__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub playback: PlaybackSettings,
    pub engine: EngineSettings,
    pub library: LibrarySettings,
    pub thumbnails: ThumbnailSettings,
    pub controls: ControlsSettings,
}

/// Initial session values. These are what the excluded settings store
/// would hand us on startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Output volume in `[0, 1]`; out of range values are clamped when applied.
    pub volume: f64,
    /// Playback rate in `[0.25, 4.0]`; clamped when applied.
    pub rate: f64,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    /// Whether shuffle starts enabled.
    pub shuffle: bool,
    /// Whether repeat-one starts enabled.
    pub repeat: bool,
    /// Search text applied to the first scanned folder.
    pub search_query: String,
    /// Move on to the next track after a decode/demux failure.
    pub advance_on_error: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: 0.8,
            rate: 1.0,
            audio_enabled: true,
            video_enabled: true,
            shuffle: false,
            repeat: false,
            search_query: String::new(),
            advance_on_error: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Position sampling interval (milliseconds).
    pub tick_ms: u64,
    /// Rendering backends to try, best first. The audio-only fallback is
    /// always tried last and does not need to be listed.
    pub backends: Vec<BackendSetting>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_ms: 250,
            backends: vec![
                BackendSetting::Paintable,
                BackendSetting::GlSurface,
                BackendSetting::Windowed,
                BackendSetting::AutoSink,
            ],
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendSetting {
    #[serde(alias = "native", alias = "paintable-surface")]
    Paintable,
    #[serde(alias = "gl", alias = "opengl", alias = "gl_surface")]
    GlSurface,
    #[serde(alias = "legacy", alias = "window")]
    Windowed,
    #[serde(alias = "auto", alias = "auto_sink")]
    AutoSink,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions treated as audio (case-insensitive, without dot).
    pub audio_extensions: Vec<String>,
    /// File extensions treated as video (case-insensitive, without dot).
    pub video_extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        let exts = |list: &[&str]| list.iter().map(|e| e.to_string()).collect();
        Self {
            audio_extensions: exts(&["mp3", "flac", "ogg", "opus", "wav", "m4a", "aac", "wma"]),
            video_extensions: exts(&[
                "mp4", "mkv", "webm", "mov", "avi", "mpg", "mpeg", "m4v", "wmv",
            ]),
            follow_links: false,
            include_hidden: false,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThumbnailSettings {
    /// Generate previews for video tracks after a folder is opened.
    pub enabled: bool,
    /// Worker count override. Whatever is given is clamped to `2..=8`;
    /// unset means "number of cores".
    pub workers: Option<usize>,
    /// Quiet period before a burst of completions is reported (milliseconds).
    pub quiet_ms: u64,
    /// Preview bounding box.
    pub width: u32,
    pub height: u32,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: None,
            quiet_ms: 200,
            width: 180,
            height: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Seconds to jump on skip back / skip forward.
    pub seek_step_secs: f64,
    /// Volume change per key press.
    pub volume_step: f64,
    /// Rate change per key press.
    pub rate_step: f64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            seek_step_secs: 10.0,
            volume_step: 0.05,
            rate_step: 0.25,
        }
    }
}
