use std::path::PathBuf;
use std::rc::Rc;

use crossbeam_channel::Sender;
use log::{debug, info, warn};

use crate::app::{App, PlayerEvent};
use crate::backend::{BackendNegotiator, DisabledBackend, NoSurfaces, RenderingBackend};
use crate::config;
use crate::engine::PlaybackEngine;
use crate::playlist::PlaylistNavigator;
use crate::thumbnail::{ThumbnailPipeline, default_extractor};

pub const USAGE: &str = "usage: cadenza [--dump-config] [FOLDER]";

/// Command line: an optional folder and a couple of flags.
#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub dir: Option<PathBuf>,
    pub dump_config: bool,
    pub help: bool,
}

impl Args {
    pub fn parse<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut out = Args::default();
        for arg in args {
            match arg.as_str() {
                "--dump-config" => out.dump_config = true,
                "-h" | "--help" => out.help = true,
                flag if flag.starts_with('-') => {
                    return Err(format!("unknown option {flag}\n{USAGE}"));
                }
                _ if out.dir.is_some() => {
                    return Err(format!("only one folder can be opened\n{USAGE}"));
                }
                _ => out.dir = Some(PathBuf::from(arg)),
            }
        }
        Ok(out)
    }
}

/// Negotiate a backend and wire the core together.
///
/// The terminal has nowhere to draw video, so every surface profile fails
/// its probe and audio-only is the best this front end can get. Without
/// even that, the engine runs on a backend that refuses media and the user
/// is told playback is disabled.
pub fn build_app(settings: &config::Settings, events: Sender<PlayerEvent>) -> App {
    let mut negotiator = BackendNegotiator::from_settings(&settings.engine, Rc::new(NoSurfaces));
    let backend: Box<dyn RenderingBackend> = match negotiator.select_backend() {
        Ok(b) => {
            info!("playback backend: {}", b.profile());
            for profile in negotiator.failed_profiles() {
                debug!("skipped backend: {profile}");
            }
            b
        }
        Err(e) => {
            warn!("playback disabled: {e}");
            let _ = events.send(PlayerEvent::Status(format!("Playback disabled: {e}")));
            Box::new(DisabledBackend::new(e.to_string()))
        }
    };

    let engine = PlaybackEngine::with_settings(backend, &settings.playback);
    let navigator = PlaylistNavigator::new(&settings.playback);

    let thumbnails = if settings.thumbnails.enabled {
        match ThumbnailPipeline::new(&settings.thumbnails, default_extractor()) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("thumbnail workers could not start: {e}");
                None
            }
        }
    } else {
        None
    };

    App::new(engine, navigator, thumbnails, settings, events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn folder_and_flags() {
        assert_eq!(parse(&[]).unwrap(), Args::default());
        let args = parse(&["--dump-config", "/music"]).unwrap();
        assert!(args.dump_config);
        assert_eq!(args.dir, Some(PathBuf::from("/music")));
        assert!(parse(&["-h"]).unwrap().help);
    }

    #[test]
    fn rejects_unknown_flags_and_extra_folders() {
        assert!(parse(&["--loud"]).unwrap_err().contains("unknown option"));
        assert!(parse(&["a", "b"]).is_err());
    }
}
