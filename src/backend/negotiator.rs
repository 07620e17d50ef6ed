use std::collections::HashSet;
use std::rc::Rc;

use log::{info, warn};

use crate::config::EngineSettings;
use crate::error::BackendError;

use super::rodio_out::RodioBackend;
use super::types::{BackendProfile, RenderingBackend, SurfaceProvider};

/// Builds a backend for one profile; construction is the capability test.
pub type Probe = Box<dyn Fn() -> Result<Box<dyn RenderingBackend>, BackendError>>;

pub struct Candidate {
    profile: BackendProfile,
    probe: Probe,
}

impl Candidate {
    pub fn new(profile: BackendProfile, probe: Probe) -> Self {
        Self { profile, probe }
    }

    pub fn profile(&self) -> BackendProfile {
        self.profile
    }
}

/// Ranked-fallback backend selection.
///
/// Candidates are tried best first and the first that constructs wins. The
/// degraded audio-only candidate is always last. A profile that failed once
/// is remembered and skipped on every later call.
pub struct BackendNegotiator {
    candidates: Vec<Candidate>,
    audio_only: Candidate,
    failed: HashSet<BackendProfile>,
}

impl BackendNegotiator {
    pub fn new(candidates: Vec<Candidate>, audio_only: Candidate) -> Self {
        Self {
            candidates,
            audio_only,
            failed: HashSet::new(),
        }
    }

    /// The stock ranking: surface profiles from `settings.backends` (each
    /// listed once) followed by the `rodio` audio-only fallback.
    pub fn from_settings(settings: &EngineSettings, provider: Rc<dyn SurfaceProvider>) -> Self {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for &setting in &settings.backends {
            let profile = BackendProfile::from(setting);
            if !seen.insert(profile) {
                warn!("backend profile {profile} listed twice; ignoring the repeat");
                continue;
            }
            let provider = provider.clone();
            candidates.push(Candidate::new(
                profile,
                Box::new(move || probe_surface(profile, provider.as_ref())),
            ));
        }

        let audio_only = Candidate::new(
            BackendProfile::AudioOnly,
            Box::new(|| {
                RodioBackend::probe().map(|b| Box::new(b) as Box<dyn RenderingBackend>)
            }),
        );

        Self::new(candidates, audio_only)
    }

    /// Profiles in the order they will be tried.
    pub fn ranking(&self) -> Vec<BackendProfile> {
        self.candidates
            .iter()
            .chain(std::iter::once(&self.audio_only))
            .map(Candidate::profile)
            .collect()
    }

    /// Profiles that failed their probe so far, in no particular order.
    pub fn failed_profiles(&self) -> impl Iterator<Item = BackendProfile> + '_ {
        self.failed.iter().copied()
    }

    pub fn select_backend(&mut self) -> Result<Box<dyn RenderingBackend>, BackendError> {
        let mut reasons = Vec::new();

        for candidate in self.candidates.iter().chain(std::iter::once(&self.audio_only)) {
            let profile = candidate.profile;
            if self.failed.contains(&profile) {
                continue;
            }
            match (candidate.probe)() {
                Ok(backend) => {
                    if !profile.has_surface() {
                        warn!("no video surface could be created; playing audio only");
                    } else {
                        info!("backend: selected {profile}");
                    }
                    return Ok(backend);
                }
                Err(e) => {
                    info!("backend: {profile} unavailable ({e})");
                    reasons.push(format!("{profile}: {e}"));
                    self.failed.insert(profile);
                }
            }
        }

        if reasons.is_empty() {
            reasons.push("every backend already failed earlier".to_string());
        }
        Err(BackendError::Unavailable(reasons.join("; ")))
    }
}

#[cfg(feature = "ffmpeg")]
fn probe_surface(
    profile: BackendProfile,
    provider: &dyn SurfaceProvider,
) -> Result<Box<dyn RenderingBackend>, BackendError> {
    super::surface::SurfaceBackend::probe(profile, provider)
        .map(|b| Box::new(b) as Box<dyn RenderingBackend>)
}

#[cfg(not(feature = "ffmpeg"))]
fn probe_surface(
    profile: BackendProfile,
    _provider: &dyn SurfaceProvider,
) -> Result<Box<dyn RenderingBackend>, BackendError> {
    Err(BackendError::Unavailable(format!(
        "{profile} needs video decoding, which is not available in this build"
    )))
}
