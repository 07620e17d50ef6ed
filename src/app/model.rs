use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use log::{debug, info, warn};

use crate::config::{ControlsSettings, LibrarySettings, Settings};
use crate::engine::{EngineEvent, PlaybackEngine, PositionTicker};
use crate::error::PlayerError;
use crate::library::{self, TrackRef};
use crate::playlist::{Advance, PlaylistNavigator};
use crate::thumbnail::ThumbnailPipeline;

use super::events::{Command, PlayerEvent};

/// The player core wired together.
pub struct App {
    engine: PlaybackEngine,
    navigator: PlaylistNavigator,
    ticker: PositionTicker,
    thumbnails: Option<ThumbnailPipeline>,
    events: Sender<PlayerEvent>,
    library: LibrarySettings,
    controls: ControlsSettings,
    advance_on_error: bool,
    /// Applied to the first folder only.
    initial_query: Option<String>,
    folder: Option<PathBuf>,
}

impl App {
    pub fn new(
        engine: PlaybackEngine,
        navigator: PlaylistNavigator,
        thumbnails: Option<ThumbnailPipeline>,
        settings: &Settings,
        events: Sender<PlayerEvent>,
    ) -> Self {
        let query = settings.playback.search_query.trim();
        Self {
            engine,
            navigator,
            ticker: PositionTicker::new(Duration::from_millis(settings.engine.tick_ms)),
            thumbnails,
            events,
            library: settings.library.clone(),
            controls: settings.controls.clone(),
            advance_on_error: settings.playback.advance_on_error,
            initial_query: (!query.is_empty()).then(|| query.to_string()),
            folder: None,
        }
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn navigator(&self) -> &PlaylistNavigator {
        &self.navigator
    }

    pub fn ticker(&self) -> &PositionTicker {
        &self.ticker
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    fn emit(&self, event: PlayerEvent) {
        // Nobody listening is not an error for the core.
        let _ = self.events.send(event);
    }

    fn status(&self, text: impl Into<String>) {
        self.emit(PlayerEvent::Status(text.into()));
    }

    fn report(&self, err: &PlayerError) {
        warn!("{err}");
        self.emit(PlayerEvent::PlaybackError {
            kind: err.kind(),
            message: err.to_string(),
        });
    }

    fn track_changed(&self, index: usize) {
        if let Some(path) = self.engine.current_path() {
            info!("playing {}", path.display());
        }
        if let Some(track) = self.navigator.track(index) {
            self.emit(PlayerEvent::TrackChanged {
                index,
                title: track.title().to_string(),
            });
        }
    }

    fn after_advance(&self, result: Result<Advance, PlayerError>) {
        match result {
            Ok(Advance::Playing(i)) => self.track_changed(i),
            Ok(Advance::Exhausted) => {
                self.emit(PlayerEvent::ListExhausted);
                self.status("Reached end of list.");
            }
            Err(e) => self.report(&e),
        }
    }

    pub fn handle(&mut self, command: Command, now: Instant) {
        debug!("command: {command:?}");
        match command {
            Command::OpenFolder(dir) => self.open_folder(&dir),
            Command::SelectTrack(index) => match self.navigator.play_index(&mut self.engine, index) {
                Ok(()) => self.track_changed(index),
                Err(e) => self.report(&e),
            },
            Command::PlayPause => {
                let before = self.engine.state();
                match self.navigator.toggle_play_pause(&mut self.engine) {
                    Ok(Some(i)) if !before.is_loaded() => self.track_changed(i),
                    Ok(_) => {}
                    Err(e) => self.report(&e),
                }
            }
            Command::Stop => self.navigator.stop(&mut self.engine),
            Command::Next => {
                let result = self.navigator.next(&mut self.engine);
                self.after_advance(result);
            }
            Command::Previous => match self.navigator.previous(&mut self.engine) {
                Ok(Some(i)) => self.track_changed(i),
                Ok(None) => {}
                Err(e) => self.report(&e),
            },
            Command::SetShuffle(on) => {
                self.navigator.set_shuffle(on);
                self.status(format!("Shuffle {}", on_off(on)));
            }
            Command::SetRepeat(on) => {
                self.navigator.set_repeat(on);
                self.status(format!("Repeat {}", on_off(on)));
            }
            Command::SetVolume(v) => {
                let applied = self.navigator.set_volume(&mut self.engine, v);
                self.status(format!("Volume {:.0}%", applied * 100.0));
            }
            Command::SetRate(r) => match self.navigator.set_rate(&mut self.engine, r) {
                Ok(applied) => self.status(format!("Rate {applied:.2}x")),
                Err(e) => self.report(&e),
            },
            Command::SetAudioEnabled(on) => {
                match self.navigator.set_audio_enabled(&mut self.engine, on) {
                    Ok(()) => self.status(format!("Audio {}", on_off(on))),
                    Err(e) => self.report(&e),
                }
            }
            Command::SetVideoEnabled(on) => {
                match self.navigator.set_video_enabled(&mut self.engine, on) {
                    Ok(()) => self.status(format!("Video {}", on_off(on))),
                    Err(e) => self.report(&e),
                }
            }
            Command::SeekTo(secs) => {
                if let Err(e) = self.engine.seek_to(secs) {
                    self.report(&e);
                }
            }
            Command::SkipBack => self.skip(-self.controls.seek_step_secs),
            Command::SkipForward => self.skip(self.controls.seek_step_secs),
            Command::Search(query) => self.navigator.apply_search(&query),
            Command::SetDragging(dragging) => self.ticker.set_dragging(dragging),
            Command::RegenerateThumbnail(index) => {
                if let (Some(pipeline), Some(track)) =
                    (self.thumbnails.as_mut(), self.navigator.track(index))
                {
                    pipeline.regenerate(track);
                }
            }
        }
        self.sync_ticker(now);
    }

    fn skip(&mut self, delta: f64) {
        if let Err(e) = self.engine.seek_relative(delta) {
            self.report(&e);
        }
    }

    /// Scan `dir` and replace the track list with what was found.
    fn open_folder(&mut self, dir: &Path) {
        if !dir.exists() {
            self.report(&PlayerError::NotFound(dir.to_path_buf()));
            return;
        }
        if !dir.is_dir() {
            self.report(&PlayerError::InvalidInput(format!(
                "{} is not a folder",
                dir.display()
            )));
            return;
        }
        let tracks = library::scan(dir, &self.library);
        self.folder = Some(dir.to_path_buf());
        self.load_tracks(tracks);
    }

    /// Install a new master list: playback stops, search and the current
    /// track reset, and preview generation starts for the new videos.
    pub fn load_tracks(&mut self, tracks: Vec<TrackRef>) {
        self.navigator.stop(&mut self.engine);
        self.ticker.stop();
        let count = tracks.len();
        self.navigator.set_tracks(tracks);
        if let Some(query) = self.initial_query.take() {
            self.navigator.apply_search(&query);
        }
        info!("loaded {count} media file(s)");
        self.status(format!("Loaded {count} media file(s)"));

        if let Some(pipeline) = self.thumbnails.as_mut() {
            pipeline.generate_all(self.navigator.tracks());
        }
    }

    /// Run everything that is due: engine events, the position ticker and
    /// thumbnail completions.
    pub fn tick(&mut self, now: Instant) {
        while let Some(event) = self.engine.poll_event() {
            match event {
                EngineEvent::EndOfStream => {
                    self.emit(PlayerEvent::EndOfStream);
                    let result = self.navigator.on_end_of_stream(&mut self.engine);
                    self.after_advance(result);
                }
                EngineEvent::Error(e) => {
                    self.navigator.mark_stopped();
                    self.report(&e);
                    if self.advance_on_error {
                        let result = self.navigator.next(&mut self.engine);
                        self.after_advance(result);
                    }
                }
            }
        }
        self.sync_ticker(now);

        if let Some(update) = self.ticker.poll(now, &self.engine) {
            self.emit(PlayerEvent::TimeUpdate(update));
        }

        let refresh = self
            .thumbnails
            .as_mut()
            .is_some_and(|pipeline| pipeline.drain(now));
        if refresh {
            self.emit(PlayerEvent::ThumbnailBatchReady);
        }
    }

    // The ticker runs exactly while something is loaded.
    fn sync_ticker(&mut self, now: Instant) {
        let loaded = self.engine.state().is_loaded();
        if loaded && !self.ticker.is_running() {
            self.ticker.start(now);
        } else if !loaded && self.ticker.is_running() {
            self.ticker.stop();
        }
    }

    /// Stop playback and let the thumbnail workers wind down.
    pub fn shutdown(&mut self) {
        self.navigator.stop(&mut self.engine);
        self.ticker.stop();
        if let Some(pipeline) = self.thumbnails.as_mut() {
            pipeline.shutdown();
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}
