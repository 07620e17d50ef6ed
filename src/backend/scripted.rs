//! In-memory backend for tests: records every call and plays back whatever
//! the test scripted into its shared state.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use crate::error::BackendError;

use super::types::{BackendEvent, BackendProfile, Capabilities, RenderingBackend, StreamFlags};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open(PathBuf, StreamFlags),
    Play,
    Pause,
    Flush,
    Seek(Duration, f64),
    Volume(f64),
    Audio(bool),
    Video(bool),
}

#[derive(Debug)]
pub struct Script {
    pub calls: Vec<Call>,
    pub caps: Capabilities,
    pub bound: Option<PathBuf>,
    pub playing: bool,
    pub position: Duration,
    pub position_known: bool,
    pub duration: Option<Duration>,
    pub rate: f64,
    pub events: VecDeque<BackendEvent>,
    /// Opens of these paths fail.
    pub bad_paths: HashSet<PathBuf>,
    /// The next `n` opens fail regardless of path.
    pub fail_next_opens: usize,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            caps: Capabilities {
                live_audio_toggle: true,
                live_video_toggle: true,
            },
            bound: None,
            playing: false,
            position: Duration::ZERO,
            position_known: true,
            duration: Some(Duration::from_secs(180)),
            rate: 1.0,
            events: VecDeque::new(),
            bad_paths: HashSet::new(),
            fail_next_opens: 0,
        }
    }
}

impl Script {
    pub fn opens(&self) -> Vec<PathBuf> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Open(p, _) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }
}

pub type ScriptHandle = Rc<RefCell<Script>>;

pub struct ScriptedBackend {
    profile: BackendProfile,
    script: ScriptHandle,
}

impl ScriptedBackend {
    pub fn new(profile: BackendProfile) -> (Self, ScriptHandle) {
        let script = ScriptHandle::default();
        (
            Self {
                profile,
                script: script.clone(),
            },
            script,
        )
    }

    pub fn boxed(profile: BackendProfile) -> (Box<dyn RenderingBackend>, ScriptHandle) {
        let (b, s) = Self::new(profile);
        (Box::new(b), s)
    }
}

impl RenderingBackend for ScriptedBackend {
    fn profile(&self) -> BackendProfile {
        self.profile
    }

    fn capabilities(&self) -> Capabilities {
        self.script.borrow().caps
    }

    fn open(&mut self, path: &Path, flags: StreamFlags) -> Result<(), BackendError> {
        let mut s = self.script.borrow_mut();
        s.calls.push(Call::Open(path.to_path_buf(), flags));
        if s.fail_next_opens > 0 {
            s.fail_next_opens -= 1;
            return Err(BackendError::Open(format!("{}: scripted failure", path.display())));
        }
        if s.bad_paths.contains(path) {
            return Err(BackendError::Open(format!("{}: unreadable", path.display())));
        }
        s.bound = Some(path.to_path_buf());
        s.playing = false;
        s.position = Duration::ZERO;
        s.rate = 1.0;
        Ok(())
    }

    fn play(&mut self) -> Result<(), BackendError> {
        let mut s = self.script.borrow_mut();
        s.calls.push(Call::Play);
        if s.bound.is_none() {
            return Err(BackendError::Transport("nothing bound".into()));
        }
        s.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        let mut s = self.script.borrow_mut();
        s.calls.push(Call::Pause);
        s.playing = false;
        Ok(())
    }

    fn flush(&mut self) {
        let mut s = self.script.borrow_mut();
        s.calls.push(Call::Flush);
        s.bound = None;
        s.playing = false;
    }

    fn seek(&mut self, position: Duration, rate: f64) -> Result<(), BackendError> {
        let mut s = self.script.borrow_mut();
        s.calls.push(Call::Seek(position, rate));
        if s.bound.is_none() {
            return Err(BackendError::Transport("nothing bound".into()));
        }
        s.position = position;
        s.rate = rate;
        Ok(())
    }

    fn position(&self) -> Option<Duration> {
        let s = self.script.borrow();
        (s.bound.is_some() && s.position_known).then_some(s.position)
    }

    fn duration(&self) -> Option<Duration> {
        let s = self.script.borrow();
        s.bound.as_ref().and(s.duration)
    }

    fn set_volume(&mut self, volume: f64) {
        self.script.borrow_mut().calls.push(Call::Volume(volume));
    }

    fn set_audio_enabled(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.script.borrow_mut().calls.push(Call::Audio(enabled));
        Ok(())
    }

    fn set_video_enabled(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.script.borrow_mut().calls.push(Call::Video(enabled));
        Ok(())
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        self.script.borrow_mut().events.pop_front()
    }
}
