//! Video-capable backend: audio through `rodio`, frames through a decoder
//! thread into a surface the host built for one capability profile.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::error::BackendError;

use super::clock::PlaybackClock;
use super::rodio_out::RodioBackend;
use super::types::{
    BackendEvent, BackendProfile, Capabilities, RenderingBackend, StreamFlags, SurfaceProvider,
    VideoSurface,
};
use super::video_feed::{FeedEvent, SharedClock, VideoFeed};

pub struct SurfaceBackend {
    profile: BackendProfile,
    surface: Arc<dyn VideoSurface>,
    audio: RodioBackend,
    clock: SharedClock,
    feed: Option<VideoFeed>,
    duration: Option<Duration>,
    bound: bool,
    eos_reported: bool,
}

impl SurfaceBackend {
    pub fn probe(
        profile: BackendProfile,
        provider: &dyn SurfaceProvider,
    ) -> Result<Self, BackendError> {
        let surface = provider.create_surface(profile)?;
        let audio = RodioBackend::probe()?;
        Ok(Self {
            profile,
            surface,
            audio,
            clock: Arc::new(Mutex::new(PlaybackClock::default())),
            feed: None,
            duration: None,
            bound: false,
            eos_reported: false,
        })
    }

    fn with_clock<R>(&self, f: impl FnOnce(&mut PlaybackClock) -> R) -> R {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut clock)
    }
}

impl RenderingBackend for SurfaceBackend {
    fn profile(&self) -> BackendProfile {
        self.profile
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            live_audio_toggle: true,
            // The decoder thread is only started at open time.
            live_video_toggle: false,
        }
    }

    fn open(&mut self, path: &Path, flags: StreamFlags) -> Result<(), BackendError> {
        self.flush();

        // Video containers often carry codecs the audio decoder cannot read;
        // that only costs us the sound, not the file.
        if let Err(e) = self.audio.open(path, flags) {
            debug!("{}: no audio track usable ({e})", self.profile);
        }

        if flags.video {
            let opened = VideoFeed::open(path, self.surface.clone(), self.clock.clone())?;
            self.feed = opened.feed;
            self.duration = self.audio.duration().or(opened.duration);
        } else {
            self.duration = self.audio.duration();
        }

        if !self.audio.is_bound() && self.feed.is_none() {
            return Err(BackendError::Open(format!(
                "{}: nothing playable with the current stream flags",
                path.display()
            )));
        }

        self.bound = true;
        self.eos_reported = false;
        info!("{}: opened {}", self.profile, path.display());
        Ok(())
    }

    fn play(&mut self) -> Result<(), BackendError> {
        if !self.bound {
            return Err(BackendError::Transport("nothing bound".to_string()));
        }
        if self.audio.is_bound() {
            self.audio.play()?;
        }
        self.with_clock(|c| c.start(Instant::now()));
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.audio.pause()?;
        self.with_clock(|c| c.pause(Instant::now()));
        Ok(())
    }

    fn flush(&mut self) {
        // Dropping the feed joins its thread.
        self.feed = None;
        self.audio.flush();
        self.with_clock(PlaybackClock::reset);
        self.surface.clear();
        self.duration = None;
        self.bound = false;
        self.eos_reported = false;
    }

    fn seek(&mut self, position: Duration, rate: f64) -> Result<(), BackendError> {
        if !self.bound {
            return Err(BackendError::Transport("nothing bound".to_string()));
        }
        if self.audio.is_bound() {
            self.audio.seek(position, rate)?;
        }
        self.with_clock(|c| c.seek(position, rate, Instant::now()));
        if let Some(feed) = self.feed.as_ref() {
            feed.seek(position);
        }
        self.eos_reported = false;
        Ok(())
    }

    fn position(&self) -> Option<Duration> {
        if !self.bound {
            return None;
        }
        if self.audio.is_bound() {
            return self.audio.position();
        }
        Some(self.with_clock(|c| c.position_at(Instant::now())))
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn set_volume(&mut self, volume: f64) {
        self.audio.set_volume(volume);
    }

    fn set_audio_enabled(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.audio.set_audio_enabled(enabled)
    }

    fn set_video_enabled(&mut self, _enabled: bool) -> Result<(), BackendError> {
        Err(BackendError::Transport(
            "video output can only change on reopen".to_string(),
        ))
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        if !self.bound || self.eos_reported {
            return None;
        }

        let feed_event = self.feed.as_ref().and_then(VideoFeed::poll);
        if let Some(FeedEvent::Failed(msg)) = feed_event {
            self.eos_reported = true;
            return Some(BackendEvent::Error(msg));
        }

        // Audio drives the end of the stream when there is audio at all.
        let finished = if self.audio.is_bound() {
            matches!(self.audio.poll_event(), Some(BackendEvent::EndOfStream))
        } else {
            matches!(feed_event, Some(FeedEvent::Finished))
        };
        if finished {
            self.eos_reported = true;
            return Some(BackendEvent::EndOfStream);
        }
        None
    }
}
