use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, unbounded};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::{TempDir, tempdir};

use super::*;
use crate::backend::scripted::{Call, ScriptHandle, ScriptedBackend};
use crate::backend::{BackendEvent, BackendProfile};
use crate::config::{Settings, ThumbnailSettings};
use crate::engine::{EngineState, PlaybackEngine};
use crate::error::PlaybackErrorKind;
use crate::library::ThumbnailState;
use crate::playlist::PlaylistNavigator;
use crate::thumbnail::{ThumbnailPipeline, UnsupportedExtractor};

struct Harness {
    dir: TempDir,
    app: App,
    script: ScriptHandle,
    events: Receiver<PlayerEvent>,
}

impl Harness {
    fn new(names: &[&str], settings: Settings, thumbnails: bool) -> Self {
        let dir = tempdir().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"fake").unwrap();
        }
        let (backend, script) = ScriptedBackend::boxed(BackendProfile::AudioOnly);
        let engine = PlaybackEngine::with_settings(backend, &settings.playback);
        let navigator = PlaylistNavigator::with_rng(&settings.playback, StdRng::seed_from_u64(5));
        let pipeline = thumbnails.then(|| {
            ThumbnailPipeline::new(&settings.thumbnails, Arc::new(UnsupportedExtractor)).unwrap()
        });
        let (tx, events) = unbounded();
        let app = App::new(engine, navigator, pipeline, &settings, tx);
        Self {
            dir,
            app,
            script,
            events,
        }
    }

    fn open(&mut self) {
        let path = self.dir.path().to_path_buf();
        self.app.handle(Command::OpenFolder(path), Instant::now());
    }

    fn send(&mut self, command: Command) {
        self.app.handle(command, Instant::now());
    }

    fn events(&self) -> Vec<PlayerEvent> {
        self.events.try_iter().collect()
    }

    fn finish_track(&mut self) {
        self.script
            .borrow_mut()
            .events
            .push_back(BackendEvent::EndOfStream);
        self.app.tick(Instant::now());
    }
}

fn harness(names: &[&str]) -> Harness {
    Harness::new(names, Settings::default(), false)
}

fn changed(index: usize, title: &str) -> PlayerEvent {
    PlayerEvent::TrackChanged {
        index,
        title: title.to_string(),
    }
}

#[test]
fn opening_a_folder_reports_the_count_and_plays_nothing() {
    let mut h = harness(&["B.mp3", "A.mp3", "C.mp3", "notes.txt"]);
    h.open();

    assert_eq!(
        h.events(),
        vec![PlayerEvent::Status("Loaded 3 media file(s)".into())]
    );
    let titles: Vec<_> = h
        .app
        .navigator()
        .tracks()
        .iter()
        .map(|t| t.title().to_string())
        .collect();
    assert_eq!(titles, vec!["A.mp3", "B.mp3", "C.mp3"]);
    assert_eq!(h.app.engine().state(), EngineState::Idle);
    assert_eq!(h.app.folder(), Some(h.dir.path()));
}

#[test]
fn opening_a_missing_folder_keeps_the_current_list() {
    let mut h = harness(&["a.mp3"]);
    h.open();
    h.events();

    let missing = h.dir.path().join("nope");
    h.send(Command::OpenFolder(missing));

    let events = h.events();
    assert!(matches!(
        events.as_slice(),
        [PlayerEvent::PlaybackError {
            kind: PlaybackErrorKind::NotFound,
            ..
        }]
    ));
    assert_eq!(h.app.navigator().tracks().len(), 1);
}

#[test]
fn playing_through_a_folder_ends_with_list_exhausted() {
    let mut h = harness(&["B.mp3", "A.mp3", "C.mp3"]);
    h.open();
    h.events();

    h.send(Command::SelectTrack(0));
    assert_eq!(h.events(), vec![changed(0, "A.mp3")]);
    assert!(h.app.ticker().is_running());

    h.finish_track();
    assert_eq!(
        h.events()
            .into_iter()
            .filter(|e| !matches!(e, PlayerEvent::TimeUpdate(_)))
            .collect::<Vec<_>>(),
        vec![PlayerEvent::EndOfStream, changed(1, "B.mp3")]
    );

    h.finish_track();
    h.events();
    h.finish_track();

    let events = h.events();
    assert!(events.contains(&PlayerEvent::ListExhausted));
    assert!(events.contains(&PlayerEvent::Status("Reached end of list.".into())));
    assert_eq!(h.app.engine().state(), EngineState::Idle);
    assert!(!h.app.ticker().is_running());
    assert!(!h.app.navigator().session().playing);
}

#[test]
fn pipeline_failure_moves_on_when_configured() {
    let mut h = harness(&["a.mp3", "b.mp3"]);
    h.open();
    h.send(Command::SelectTrack(0));
    h.events();

    h.script
        .borrow_mut()
        .events
        .push_back(BackendEvent::Error("demux error".into()));
    h.app.tick(Instant::now());

    let events = h.events();
    assert!(matches!(
        events.first(),
        Some(PlayerEvent::PlaybackError {
            kind: PlaybackErrorKind::PipelineFailure,
            ..
        })
    ));
    assert!(events.contains(&changed(1, "b.mp3")));
    assert_eq!(h.app.engine().state(), EngineState::Playing);
}

#[test]
fn pipeline_failure_stops_when_advancing_is_off() {
    let mut settings = Settings::default();
    settings.playback.advance_on_error = false;
    let mut h = Harness::new(&["a.mp3", "b.mp3"], settings, false);
    h.open();
    h.send(Command::SelectTrack(0));
    h.events();

    h.script
        .borrow_mut()
        .events
        .push_back(BackendEvent::Error("demux error".into()));
    h.app.tick(Instant::now());

    assert!(!h.events().iter().any(|e| matches!(e, PlayerEvent::TrackChanged { .. })));
    assert_eq!(h.app.engine().state(), EngineState::Idle);
    assert!(!h.app.navigator().session().playing);
    assert_eq!(h.app.navigator().current(), Some(0));
}

#[test]
fn ticker_publishes_while_loaded_only() {
    let mut h = harness(&["a.mp3"]);
    h.open();
    let t0 = Instant::now();
    h.app.handle(Command::SelectTrack(0), t0);
    h.events();

    h.script.borrow_mut().position = Duration::from_secs(30);
    h.app.tick(t0);
    let updates: Vec<_> = h
        .events()
        .into_iter()
        .filter_map(|e| match e {
            PlayerEvent::TimeUpdate(u) => Some(u),
            _ => None,
        })
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].label, "00:30 / 03:00");
    assert_eq!(updates[0].position, Some(30.0));

    // Not due again until the interval passes.
    h.app.tick(t0 + Duration::from_millis(100));
    assert!(h.events().is_empty());

    h.app.handle(Command::SetDragging(true), t0);
    h.app.tick(t0 + Duration::from_millis(300));
    assert!(matches!(
        h.events().as_slice(),
        [PlayerEvent::TimeUpdate(u)] if u.position.is_none()
    ));

    h.send(Command::Stop);
    assert!(!h.app.ticker().is_running());
    h.app.tick(t0 + Duration::from_secs(5));
    assert!(h.events().is_empty());
}

#[test]
fn skip_moves_by_the_configured_step() {
    let mut h = harness(&["a.mp3"]);
    h.open();
    h.send(Command::SelectTrack(0));

    h.script.borrow_mut().position = Duration::from_secs(30);
    h.send(Command::SkipForward);
    assert_eq!(
        h.script.borrow().calls.last(),
        Some(&Call::Seek(Duration::from_secs(40), 1.0))
    );

    h.script.borrow_mut().position = Duration::from_secs(4);
    h.send(Command::SkipBack);
    assert_eq!(
        h.script.borrow().calls.last(),
        Some(&Call::Seek(Duration::ZERO, 1.0))
    );
}

#[test]
fn skip_with_nothing_loaded_is_reported() {
    let mut h = harness(&["a.mp3"]);
    h.open();
    h.events();

    h.send(Command::SkipForward);
    assert!(matches!(
        h.events().as_slice(),
        [PlayerEvent::PlaybackError {
            kind: PlaybackErrorKind::InvalidInput,
            ..
        }]
    ));
}

#[test]
fn bad_selection_leaves_playback_alone() {
    let mut h = harness(&["a.mp3", "b.mp3"]);
    h.open();
    h.send(Command::SelectTrack(1));
    h.events();

    h.send(Command::SelectTrack(42));

    assert!(matches!(
        h.events().as_slice(),
        [PlayerEvent::PlaybackError {
            kind: PlaybackErrorKind::InvalidInput,
            ..
        }]
    ));
    assert_eq!(h.app.engine().state(), EngineState::Playing);
    assert_eq!(h.app.navigator().current(), Some(1));
}

#[test]
fn play_pause_from_idle_announces_the_track() {
    let mut h = harness(&["a.mp3", "b.mp3"]);
    h.open();
    h.events();

    h.send(Command::PlayPause);
    assert_eq!(h.events(), vec![changed(0, "a.mp3")]);

    h.send(Command::PlayPause);
    assert!(h.events().is_empty());
    assert_eq!(h.app.engine().state(), EngineState::Paused);
}

#[test]
fn toggles_report_their_new_state() {
    let mut h = harness(&["a.mp3"]);
    h.open();
    h.events();

    h.send(Command::SetShuffle(true));
    h.send(Command::SetRepeat(false));
    h.send(Command::SetVolume(1.7));
    h.send(Command::SetRate(2.0));

    assert_eq!(
        h.events(),
        vec![
            PlayerEvent::Status("Shuffle on".into()),
            PlayerEvent::Status("Repeat off".into()),
            PlayerEvent::Status("Volume 100%".into()),
            PlayerEvent::Status("Rate 2.00x".into()),
        ]
    );
    assert!(h.app.navigator().session().shuffle);
    assert_eq!(h.app.engine().volume(), 1.0);
}

#[test]
fn stored_search_applies_to_the_first_folder_only() {
    let mut settings = Settings::default();
    settings.playback.search_query = "live".into();
    let mut h = Harness::new(&["live set.mp3", "studio.mp3"], settings, false);

    h.open();
    assert_eq!(h.app.navigator().visible(), &[0]);
    assert_eq!(h.app.navigator().query(), "live");

    h.open();
    assert_eq!(h.app.navigator().visible(), &[0, 1]);
}

#[test]
fn finished_previews_are_announced_once() {
    let mut settings = Settings::default();
    settings.thumbnails = ThumbnailSettings {
        workers: Some(2),
        quiet_ms: 20,
        ..ThumbnailSettings::default()
    };
    let mut h = Harness::new(&["one.mkv", "two.mp4", "song.mp3"], settings, true);
    h.open();

    let settled = |h: &Harness| {
        h.app
            .navigator()
            .tracks()
            .iter()
            .filter(|t| t.is_video())
            .all(|t| t.thumbnail().state() == ThumbnailState::Failed)
    };
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut batches = 0;
    while batches == 0 || !settled(&h) {
        assert!(Instant::now() < deadline, "no thumbnail batch was reported");
        thread::sleep(Duration::from_millis(5));
        h.app.tick(Instant::now());
        batches += h
            .events()
            .iter()
            .filter(|e| **e == PlayerEvent::ThumbnailBatchReady)
            .count();
    }
    assert!(batches >= 1);

    // Both videos failed (no decoder here), the audio track was never queued.
    let states: Vec<_> = h
        .app
        .navigator()
        .tracks()
        .iter()
        .map(|t| t.thumbnail().state())
        .collect();
    assert_eq!(
        states,
        vec![
            ThumbnailState::Failed,
            ThumbnailState::NotRequested,
            ThumbnailState::Failed
        ]
    );

    h.app.shutdown();
    h.app.tick(Instant::now() + Duration::from_secs(1));
    assert!(!h.events().contains(&PlayerEvent::ThumbnailBatchReady));
}
