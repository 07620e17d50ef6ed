use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use log::{debug, info};

use crate::config::PlaybackSettings;
use crate::engine::{EngineState, PlaybackEngine};
use crate::error::PlayerError;
use crate::library::TrackRef;

use super::session::PlaybackSession;
use super::view::VisibleView;

/// Random draws before shuffle gives up and takes the next track in order.
pub const SHUFFLE_ATTEMPTS: usize = 12;

/// Outcome of moving to another track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Now playing this master index.
    Playing(usize),
    /// Nothing left to play; the session was stopped.
    Exhausted,
}

/// Master list, visible view and session, plus the next/previous policy.
///
/// Track indices are always master-list indices; positions in the visible
/// view are kept internal.
pub struct PlaylistNavigator {
    master: Vec<TrackRef>,
    view: VisibleView,
    session: PlaybackSession,
    rng: StdRng,
}

impl PlaylistNavigator {
    pub fn new(settings: &PlaybackSettings) -> Self {
        Self::with_rng(settings, StdRng::from_os_rng())
    }

    /// Same as [`new`](Self::new) with a caller-supplied shuffle source.
    pub fn with_rng(settings: &PlaybackSettings, rng: StdRng) -> Self {
        Self {
            master: Vec::new(),
            view: VisibleView::default(),
            session: PlaybackSession::from_settings(settings),
            rng,
        }
    }

    /// Replace the master list wholesale. Search, current track and the
    /// playing flag are reset; the caller stops the engine.
    pub fn set_tracks(&mut self, tracks: Vec<TrackRef>) {
        self.view = VisibleView::new(&tracks);
        self.master = tracks;
        self.session.current = None;
        self.session.playing = false;
        info!("playlist: {} track(s)", self.master.len());
    }

    pub fn tracks(&self) -> &[TrackRef] {
        &self.master
    }

    pub fn track(&self, index: usize) -> Option<&TrackRef> {
        self.master.get(index)
    }

    /// Visible master indices, in master order.
    pub fn visible(&self) -> &[usize] {
        self.view.indices()
    }

    pub fn visible_tracks(&self) -> impl Iterator<Item = (usize, &TrackRef)> + '_ {
        self.view
            .indices()
            .iter()
            .filter_map(|&i| self.master.get(i).map(|t| (i, t)))
    }

    pub fn query(&self) -> &str {
        self.view.query()
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn current(&self) -> Option<usize> {
        self.session.current
    }

    /// Refilter the visible view. Applying the same query twice gives the
    /// same view; an empty query restores the full list. The current track
    /// always stays visible.
    pub fn apply_search(&mut self, query: &str) {
        self.view.apply(query, self.session.current);
        debug!(
            "playlist: search {query:?} -> {} of {}",
            self.view.indices().len(),
            self.master.len()
        );
    }

    fn current_position(&self) -> Option<usize> {
        self.session
            .current
            .and_then(|c| self.view.position_of(c))
    }

    /// The track that should play after the current one, or `None` at the
    /// end of the view. With nothing current, the first visible track.
    pub fn choose_next(&mut self) -> Option<usize> {
        let visible = self.view.indices();
        let n = visible.len();
        if n == 0 {
            return None;
        }
        let cur = self
            .session
            .current
            .and_then(|c| visible.iter().position(|&i| i == c));

        if !self.session.shuffle {
            let next = cur.map_or(0, |p| p + 1);
            return visible.get(next).copied();
        }

        if n == 1 {
            return Some(visible[0]);
        }
        for _ in 0..SHUFFLE_ATTEMPTS {
            let pick = self.rng.random_range(0..n);
            if Some(pick) != cur {
                return Some(visible[pick]);
            }
        }
        Some(visible[(cur.unwrap_or(0) + 1) % n])
    }

    /// One step back, clamped at the first visible track.
    pub fn choose_previous(&self) -> Option<usize> {
        let visible = self.view.indices();
        let pos = match self.current_position() {
            Some(p) if p > 0 => p - 1,
            _ => 0,
        };
        visible.get(pos).copied()
    }

    /// Load and start `index`. On failure the session reflects whatever the
    /// engine is left doing.
    pub fn play_index(
        &mut self,
        engine: &mut PlaybackEngine,
        index: usize,
    ) -> Result<(), PlayerError> {
        let track = self
            .master
            .get(index)
            .cloned()
            .ok_or_else(|| PlayerError::InvalidInput(format!("no track at index {index}")))?;

        let started = engine.load(track.path()).and_then(|()| engine.play());
        if let Err(e) = started {
            self.session.playing = engine.state() == EngineState::Playing;
            return Err(e);
        }

        self.session.current = Some(index);
        self.session.playing = true;
        if !self.view.contains(index) {
            let query = self.view.query().to_string();
            self.view.apply(&query, Some(index));
        }
        info!("playlist: playing [{index}] {}", track.title());
        Ok(())
    }

    pub fn next(&mut self, engine: &mut PlaybackEngine) -> Result<Advance, PlayerError> {
        match self.choose_next() {
            Some(i) => {
                self.play_index(engine, i)?;
                Ok(Advance::Playing(i))
            }
            None => {
                self.stop(engine);
                info!("playlist: reached end of list");
                Ok(Advance::Exhausted)
            }
        }
    }

    /// Returns `None` when the view is empty, in which case nothing changes.
    pub fn previous(&mut self, engine: &mut PlaybackEngine) -> Result<Option<usize>, PlayerError> {
        let Some(i) = self.choose_previous() else {
            return Ok(None);
        };
        self.play_index(engine, i)?;
        Ok(Some(i))
    }

    /// Repeat replays the current track; otherwise advance, stopping at the
    /// end of the view instead of wrapping.
    pub fn on_end_of_stream(&mut self, engine: &mut PlaybackEngine) -> Result<Advance, PlayerError> {
        if self.session.repeat {
            if let Some(cur) = self.session.current {
                self.play_index(engine, cur)?;
                return Ok(Advance::Playing(cur));
            }
        }
        self.next(engine)
    }

    /// Play/pause. From a stopped engine this restarts the current track, or
    /// the first visible one when there is none.
    pub fn toggle_play_pause(
        &mut self,
        engine: &mut PlaybackEngine,
    ) -> Result<Option<usize>, PlayerError> {
        match engine.state() {
            EngineState::Playing => {
                engine.pause()?;
                self.session.playing = false;
                Ok(self.session.current)
            }
            EngineState::Loaded | EngineState::Paused => {
                engine.play()?;
                self.session.playing = true;
                Ok(self.session.current)
            }
            EngineState::Idle => {
                let target = self
                    .session
                    .current
                    .or_else(|| self.view.indices().first().copied());
                match target {
                    Some(i) => {
                        self.play_index(engine, i)?;
                        Ok(Some(i))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    pub fn stop(&mut self, engine: &mut PlaybackEngine) {
        engine.stop();
        self.session.playing = false;
    }

    /// The engine stopped on its own (e.g. a pipeline failure).
    pub fn mark_stopped(&mut self) {
        self.session.playing = false;
    }

    pub fn set_shuffle(&mut self, on: bool) {
        self.session.shuffle = on;
    }

    pub fn set_repeat(&mut self, on: bool) {
        self.session.repeat = on;
    }

    pub fn set_volume(&mut self, engine: &mut PlaybackEngine, volume: f64) -> f64 {
        self.session.volume = engine.set_volume(volume);
        self.session.volume
    }

    pub fn set_rate(&mut self, engine: &mut PlaybackEngine, rate: f64) -> Result<f64, PlayerError> {
        let result = engine.set_rate(rate);
        self.session.rate = engine.rate();
        result
    }

    pub fn set_audio_enabled(
        &mut self,
        engine: &mut PlaybackEngine,
        enabled: bool,
    ) -> Result<(), PlayerError> {
        let result = engine.set_audio_enabled(enabled);
        self.sync_from_engine(engine);
        result
    }

    pub fn set_video_enabled(
        &mut self,
        engine: &mut PlaybackEngine,
        enabled: bool,
    ) -> Result<(), PlayerError> {
        let result = engine.set_video_enabled(enabled);
        self.sync_from_engine(engine);
        result
    }

    // A failed reload may have reverted flags or stopped the engine.
    fn sync_from_engine(&mut self, engine: &PlaybackEngine) {
        self.session.audio_enabled = engine.audio_enabled();
        self.session.video_enabled = engine.video_enabled();
        self.session.playing = engine.state() == EngineState::Playing;
    }
}
