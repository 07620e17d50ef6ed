//! Audio-only backend on top of `rodio`.
//!
//! One `OutputStream` is opened at probe time and kept for the life of the
//! backend; every `open` builds a fresh paused `Sink` on its mixer.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use log::{debug, trace};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::BackendError;

use super::types::{BackendEvent, BackendProfile, Capabilities, RenderingBackend, StreamFlags};

pub struct RodioBackend {
    stream: OutputStream,
    sink: Option<Sink>,
    duration: Option<Duration>,
    volume: f64,
    audio_enabled: bool,
    eos_reported: bool,
}

impl RodioBackend {
    /// Open the default output device. This is the audio capability test.
    pub fn probe() -> Result<Self, BackendError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| BackendError::Unavailable(format!("no audio output device: {e}")))?;
        // rodio logs to stderr when the stream is dropped; noisy in a terminal.
        stream.log_on_drop(false);

        Ok(Self {
            stream,
            sink: None,
            duration: None,
            volume: 1.0,
            audio_enabled: true,
            eos_reported: false,
        })
    }

    pub fn is_bound(&self) -> bool {
        self.sink.is_some()
    }

    // Audio "disabled" is a mute; the configured volume is kept for later.
    fn effective_volume(&self) -> f32 {
        if self.audio_enabled {
            self.volume as f32
        } else {
            0.0
        }
    }
}

fn open_source(path: &Path) -> Result<Decoder<BufReader<File>>, BackendError> {
    let file =
        File::open(path).map_err(|e| BackendError::Open(format!("{}: {e}", path.display())))?;
    Decoder::new(BufReader::new(file))
        .map_err(|e| BackendError::Open(format!("{}: {e}", path.display())))
}

impl RenderingBackend for RodioBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile::AudioOnly
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            live_audio_toggle: true,
            // Nothing is drawn, so there is nothing to switch.
            live_video_toggle: true,
        }
    }

    fn open(&mut self, path: &Path, flags: StreamFlags) -> Result<(), BackendError> {
        self.flush();

        let source = open_source(path)?;
        self.duration = source.total_duration();

        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        sink.append(source);

        self.audio_enabled = flags.audio;
        sink.set_volume(self.effective_volume());
        self.sink = Some(sink);
        self.eos_reported = false;

        debug!(
            "rodio: opened {} (duration {:?})",
            path.display(),
            self.duration
        );
        Ok(())
    }

    fn play(&mut self) -> Result<(), BackendError> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| BackendError::Transport("nothing bound".to_string()))?;
        sink.play();
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        if let Some(sink) = self.sink.as_ref() {
            sink.pause();
        }
        Ok(())
    }

    fn flush(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
            trace!("rodio: flushed sink");
        }
        self.duration = None;
        self.eos_reported = false;
    }

    fn seek(&mut self, position: Duration, rate: f64) -> Result<(), BackendError> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| BackendError::Transport("nothing bound".to_string()))?;
        sink.set_speed(rate as f32);
        sink.try_seek(position)
            .map_err(|e| BackendError::Transport(format!("seek to {position:?} failed: {e}")))?;
        // A seek back from the very end revives a finished stream.
        self.eos_reported = false;
        Ok(())
    }

    fn position(&self) -> Option<Duration> {
        self.sink.as_ref().map(Sink::get_pos)
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
        let effective = self.effective_volume();
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(effective);
        }
    }

    fn set_audio_enabled(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.audio_enabled = enabled;
        let effective = self.effective_volume();
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(effective);
        }
        Ok(())
    }

    fn set_video_enabled(&mut self, _enabled: bool) -> Result<(), BackendError> {
        Ok(())
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        let sink = self.sink.as_ref()?;
        if !self.eos_reported && sink.empty() {
            self.eos_reported = true;
            return Some(BackendEvent::EndOfStream);
        }
        None
    }
}
