use std::fs;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::{TempDir, tempdir};

use super::*;
use crate::backend::scripted::{ScriptHandle, ScriptedBackend};
use crate::backend::{BackendEvent, BackendProfile, Capabilities};
use crate::config::{LibrarySettings, PlaybackSettings};
use crate::engine::{EngineEvent, EngineState, PlaybackEngine};
use crate::error::PlayerError;
use crate::library::scan;

struct Fixture {
    dir: TempDir,
    nav: PlaylistNavigator,
    engine: PlaybackEngine,
    script: ScriptHandle,
}

fn fixture_with(names: &[&str], settings: &PlaybackSettings, seed: u64) -> Fixture {
    let dir = tempdir().unwrap();
    for name in names {
        fs::write(dir.path().join(name), b"not real media").unwrap();
    }
    let tracks = scan(dir.path(), &LibrarySettings::default());
    let (backend, script) = ScriptedBackend::boxed(BackendProfile::AudioOnly);
    let engine = PlaybackEngine::with_settings(backend, settings);
    let mut nav = PlaylistNavigator::with_rng(settings, StdRng::seed_from_u64(seed));
    nav.set_tracks(tracks);
    Fixture {
        dir,
        nav,
        engine,
        script,
    }
}

fn fixture(names: &[&str]) -> Fixture {
    fixture_with(names, &PlaybackSettings::default(), 7)
}

fn titles(nav: &PlaylistNavigator) -> Vec<String> {
    nav.visible_tracks()
        .map(|(_, t)| t.title().to_string())
        .collect()
}

#[test]
fn folder_of_three_plays_through_in_order_and_stops() {
    let mut f = fixture(&["B.mp3", "A.mp3", "C.mp3"]);
    assert_eq!(titles(&f.nav), vec!["A.mp3", "B.mp3", "C.mp3"]);

    f.nav.play_index(&mut f.engine, 0).unwrap();
    assert_eq!(f.nav.choose_next(), Some(1));

    f.nav.play_index(&mut f.engine, 1).unwrap();
    f.script
        .borrow_mut()
        .events
        .push_back(BackendEvent::EndOfStream);
    assert!(matches!(f.engine.poll_event(), Some(EngineEvent::EndOfStream)));
    assert_eq!(f.nav.choose_next(), Some(2));
    assert_eq!(
        f.nav.on_end_of_stream(&mut f.engine).unwrap(),
        Advance::Playing(2)
    );

    assert_eq!(f.nav.choose_next(), None);
    assert_eq!(
        f.nav.on_end_of_stream(&mut f.engine).unwrap(),
        Advance::Exhausted
    );
    assert_eq!(f.engine.state(), EngineState::Idle);
    assert!(!f.nav.session().playing);
    assert_eq!(f.nav.current(), Some(2));
}

#[test]
fn next_with_nothing_current_starts_at_the_top() {
    let mut f = fixture(&["b.mp3", "a.mp3"]);
    assert_eq!(f.nav.choose_next(), Some(0));
    assert_eq!(f.nav.next(&mut f.engine).unwrap(), Advance::Playing(0));
    assert_eq!(f.engine.state(), EngineState::Playing);
}

#[test]
fn next_past_the_last_track_stops_instead_of_wrapping() {
    let mut f = fixture(&["a.mp3", "b.mp3"]);
    f.nav.play_index(&mut f.engine, 1).unwrap();

    assert_eq!(f.nav.next(&mut f.engine).unwrap(), Advance::Exhausted);
    assert_eq!(f.engine.state(), EngineState::Idle);
    assert!(!f.nav.session().playing);
}

#[test]
fn shuffle_with_one_visible_track_always_returns_it() {
    let mut f = fixture_with(
        &["alpha.mp3", "beta.mp3", "gamma.mp3"],
        &PlaybackSettings {
            shuffle: true,
            ..PlaybackSettings::default()
        },
        1,
    );
    f.nav.apply_search("beta");
    assert_eq!(f.nav.visible(), &[1]);

    for _ in 0..200 {
        assert_eq!(f.nav.choose_next(), Some(1));
    }

    f.nav.play_index(&mut f.engine, 1).unwrap();
    for _ in 0..200 {
        assert_eq!(f.nav.choose_next(), Some(1));
    }
}

fn assert_shuffle_never_repeats(names: &[&str], seed: u64) {
    let mut f = fixture_with(
        names,
        &PlaybackSettings {
            shuffle: true,
            ..PlaybackSettings::default()
        },
        seed,
    );
    f.nav.play_index(&mut f.engine, 0).unwrap();

    for _ in 0..1000 {
        let before = f.nav.current().unwrap();
        let Advance::Playing(next) = f.nav.next(&mut f.engine).unwrap() else {
            panic!("shuffle never runs out");
        };
        assert_ne!(next, before);
        assert!(next < names.len());
    }
}

#[test]
fn shuffle_never_picks_the_current_track_again() {
    assert_shuffle_never_repeats(
        &["1.mp3", "2.mp3", "3.mp3", "4.mp3", "5.mp3", "6.mp3", "7.mp3"],
        42,
    );
}

#[test]
fn shuffle_over_two_tracks_alternates() {
    // With two tracks half the draws collide, so the fallback path runs too.
    assert_shuffle_never_repeats(&["x.mp3", "y.mp3"], 3);
}

#[test]
fn repeat_replays_the_current_track_on_end_of_stream() {
    let mut f = fixture_with(
        &["a.mp3", "b.mp3", "c.mp3"],
        &PlaybackSettings {
            repeat: true,
            ..PlaybackSettings::default()
        },
        7,
    );
    f.nav.play_index(&mut f.engine, 1).unwrap();

    for _ in 0..5 {
        assert_eq!(
            f.nav.on_end_of_stream(&mut f.engine).unwrap(),
            Advance::Playing(1)
        );
    }

    let opens = f.script.borrow().opens();
    assert_eq!(opens.len(), 6);
    assert!(opens.iter().all(|p| p.ends_with("b.mp3")));
}

#[test]
fn repeat_without_a_current_track_advances() {
    let mut f = fixture_with(
        &["a.mp3", "b.mp3"],
        &PlaybackSettings {
            repeat: true,
            ..PlaybackSettings::default()
        },
        7,
    );
    assert_eq!(
        f.nav.on_end_of_stream(&mut f.engine).unwrap(),
        Advance::Playing(0)
    );
}

#[test]
fn previous_clamps_at_the_first_visible_track() {
    let mut f = fixture(&["a.mp3", "b.mp3", "c.mp3"]);
    assert_eq!(f.nav.choose_previous(), Some(0));

    f.nav.play_index(&mut f.engine, 0).unwrap();
    assert_eq!(f.nav.choose_previous(), Some(0));

    f.nav.play_index(&mut f.engine, 2).unwrap();
    assert_eq!(f.nav.previous(&mut f.engine).unwrap(), Some(1));
    assert_eq!(f.nav.current(), Some(1));

    f.nav.set_tracks(Vec::new());
    assert_eq!(f.nav.previous(&mut f.engine).unwrap(), None);
}

#[test]
fn search_is_case_insensitive_and_idempotent() {
    let mut f = fixture(&["Rock Song.mp3", "jazz.flac", "ROCKET.ogg", "clip.mkv"]);
    let full = f.nav.visible().to_vec();

    f.nav.apply_search("rock");
    let once = f.nav.visible().to_vec();
    f.nav.apply_search("rock");
    assert_eq!(f.nav.visible(), once.as_slice());
    assert_eq!(titles(&f.nav), vec!["Rock Song.mp3", "ROCKET.ogg"]);

    f.nav.apply_search("MKV");
    assert_eq!(titles(&f.nav), vec!["clip.mkv"]);

    f.nav.apply_search("nothing matches");
    assert!(f.nav.visible().is_empty());
    assert_eq!(f.nav.choose_next(), None);

    f.nav.apply_search("");
    assert_eq!(f.nav.visible(), full.as_slice());
    assert_eq!(f.nav.query(), "");
}

#[test]
fn search_never_hides_the_current_track() {
    let mut f = fixture(&["a.mp3", "b.mp3", "c.mp3"]);
    f.nav.play_index(&mut f.engine, 0).unwrap();

    f.nav.apply_search("c.");
    assert_eq!(f.nav.visible(), &[0, 2]);
    assert_eq!(f.nav.choose_next(), Some(2));
}

#[test]
fn new_track_list_resets_search_and_current() {
    let mut f = fixture(&["a.mp3", "b.mp3"]);
    f.nav.play_index(&mut f.engine, 1).unwrap();
    f.nav.apply_search("b");

    let tracks = f.nav.tracks().to_vec();
    f.nav.set_tracks(tracks);

    assert_eq!(f.nav.current(), None);
    assert!(!f.nav.session().playing);
    assert_eq!(f.nav.query(), "");
    assert_eq!(f.nav.visible(), &[0, 1]);
}

#[test]
fn failed_play_keeps_the_previous_session() {
    let mut f = fixture(&["a.mp3", "b.mp3"]);
    f.nav.play_index(&mut f.engine, 0).unwrap();

    assert!(matches!(
        f.nav.play_index(&mut f.engine, 9),
        Err(PlayerError::InvalidInput(_))
    ));

    fs::remove_file(f.dir.path().join("b.mp3")).unwrap();
    assert!(matches!(
        f.nav.play_index(&mut f.engine, 1),
        Err(PlayerError::NotFound(_))
    ));

    assert_eq!(f.nav.current(), Some(0));
    assert!(f.nav.session().playing);
    assert_eq!(f.engine.state(), EngineState::Playing);
}

#[test]
fn toggle_play_pause_walks_the_transport() {
    let mut f = fixture(&["a.mp3", "b.mp3"]);

    assert_eq!(f.nav.toggle_play_pause(&mut f.engine).unwrap(), Some(0));
    assert_eq!(f.engine.state(), EngineState::Playing);

    f.nav.toggle_play_pause(&mut f.engine).unwrap();
    assert_eq!(f.engine.state(), EngineState::Paused);
    assert!(!f.nav.session().playing);

    f.nav.toggle_play_pause(&mut f.engine).unwrap();
    assert_eq!(f.engine.state(), EngineState::Playing);

    f.nav.play_index(&mut f.engine, 1).unwrap();
    f.nav.stop(&mut f.engine);
    assert_eq!(f.nav.toggle_play_pause(&mut f.engine).unwrap(), Some(1));
    assert_eq!(f.engine.state(), EngineState::Playing);
}

#[test]
fn toggle_on_an_empty_list_does_nothing() {
    let mut f = fixture(&[]);
    assert_eq!(f.nav.toggle_play_pause(&mut f.engine).unwrap(), None);
    assert_eq!(f.engine.state(), EngineState::Idle);
}

#[test]
fn session_mirrors_clamped_engine_values() {
    let mut f = fixture(&["a.mp3"]);
    assert_eq!(f.nav.set_volume(&mut f.engine, 3.0), 1.0);
    assert_eq!(f.nav.session().volume, 1.0);
    assert_eq!(f.nav.set_rate(&mut f.engine, 0.01).unwrap(), 0.25);
    assert_eq!(f.nav.session().rate, 0.25);

    f.nav.set_shuffle(true);
    f.nav.set_repeat(true);
    assert!(f.nav.session().shuffle && f.nav.session().repeat);
}

#[test]
fn session_reflects_a_reverted_reload() {
    let mut f = fixture(&["clip.mkv"]);
    f.script.borrow_mut().caps = Capabilities {
        live_audio_toggle: true,
        live_video_toggle: false,
    };
    f.nav.play_index(&mut f.engine, 0).unwrap();
    f.script.borrow_mut().fail_next_opens = 1;

    let err = f.nav.set_video_enabled(&mut f.engine, false).unwrap_err();

    assert!(matches!(err, PlayerError::ReloadFailed { reverted: true, .. }));
    assert!(f.nav.session().video_enabled);
    assert!(f.nav.session().playing);
}
