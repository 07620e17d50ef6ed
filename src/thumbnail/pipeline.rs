use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info, trace, warn};

use crate::config::ThumbnailSettings;
use crate::error::ThumbnailError;
use crate::library::{ThumbnailState, TrackRef};

use super::debounce::Debouncer;
use super::extract::FrameExtractor;
use super::pool::{WorkerPool, pool_size};

/// One queued extraction.
#[derive(Debug, Clone)]
pub struct ThumbnailTask {
    pub track: TrackRef,
    pub requested_at: Instant,
}

#[derive(Debug)]
enum Outcome {
    Ready,
    Failed(ThumbnailError),
    /// Another task already claimed the slot.
    Skipped,
}

struct Completion {
    track: TrackRef,
    outcome: Outcome,
}

/// Everything a worker needs, cloned into every job.
#[derive(Clone)]
struct WorkerContext {
    extractor: Arc<dyn FrameExtractor>,
    alive: Arc<Mutex<bool>>,
    done: Sender<Completion>,
    width: u32,
    height: u32,
}

impl WorkerContext {
    fn is_alive(&self) -> bool {
        *self.alive.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, task: ThumbnailTask) {
        if !self.is_alive() {
            return;
        }
        let track = task.track;
        let slot = track.thumbnail();
        let outcome = match slot.try_begin() {
            Some(claim) => {
                trace!(
                    "thumbnail: {} picked up after {:?}",
                    track.title(),
                    task.requested_at.elapsed()
                );
                let outcome = match self.extractor.extract(track.path(), self.width, self.height) {
                    Ok(image) if slot.complete(claim, image.clone()) => Outcome::Ready,
                    Err(e) if slot.fail(claim) => Outcome::Failed(e),
                    _ => Outcome::Skipped,
                };
                if matches!(outcome, Outcome::Skipped) {
                    debug!("thumbnail: stale result for {} discarded", track.title());
                }
                outcome
            }
            None => Outcome::Skipped,
        };

        // Held across the send so shutdown cannot slip in between the check
        // and the delivery.
        let alive = self.alive.lock().unwrap_or_else(PoisonError::into_inner);
        if !*alive {
            debug!(
                "thumbnail: dropping result for {} after shutdown",
                track.title()
            );
            return;
        }
        let _ = self.done.send(Completion { track, outcome });
    }
}

/// Worker pool plus the control-thread side of its completions.
///
/// Only [`drain`](Self::drain) looks at completions, so the refresh signal
/// is always raised on the thread that calls it.
pub struct ThumbnailPipeline {
    pool: WorkerPool,
    ctx: WorkerContext,
    done_rx: Receiver<Completion>,
    debounce: Debouncer,
    enabled: bool,
    outstanding: usize,
}

impl ThumbnailPipeline {
    pub fn new(
        settings: &ThumbnailSettings,
        extractor: Arc<dyn FrameExtractor>,
    ) -> io::Result<Self> {
        let pool = WorkerPool::new(pool_size(settings.workers))?;
        let (done, done_rx) = unbounded();
        info!(
            "thumbnails: {} worker(s), preview {}x{}",
            pool.size(),
            settings.width,
            settings.height
        );
        Ok(Self {
            pool,
            ctx: WorkerContext {
                extractor,
                alive: Arc::new(Mutex::new(true)),
                done,
                width: settings.width,
                height: settings.height,
            },
            done_rx,
            debounce: Debouncer::new(Duration::from_millis(settings.quiet_ms)),
            enabled: settings.enabled,
            outstanding: 0,
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    /// Tasks queued or running whose completion has not been drained yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn is_alive(&self) -> bool {
        self.ctx.is_alive()
    }

    fn submit(&mut self, track: TrackRef) -> bool {
        let ctx = self.ctx.clone();
        let task = ThumbnailTask {
            track,
            requested_at: Instant::now(),
        };
        if self.pool.execute(move || ctx.run(task)) {
            self.outstanding += 1;
            true
        } else {
            false
        }
    }

    /// Queue every video track that has no preview yet. Failed tracks are
    /// left alone until [`regenerate`](Self::regenerate) asks again.
    /// Returns the number of tasks queued.
    pub fn generate_all(&mut self, tracks: &[TrackRef]) -> usize {
        if !self.enabled || !self.is_alive() {
            return 0;
        }
        let mut queued = 0;
        for track in tracks {
            if track.is_video()
                && track.thumbnail().state() == ThumbnailState::NotRequested
                && self.submit(track.clone())
            {
                queued += 1;
            }
        }
        debug!("thumbnails: queued {queued} of {} track(s)", tracks.len());
        queued
    }

    /// Throw away whatever `track` has and extract again.
    pub fn regenerate(&mut self, track: &TrackRef) -> bool {
        if !self.enabled || !self.is_alive() || !track.is_video() {
            return false;
        }
        track.thumbnail().invalidate();
        self.submit(track.clone())
    }

    /// Take every completion delivered so far, then report whether the
    /// quiet window after the last one has passed. `true` is the single
    /// "refresh now" for a burst.
    pub fn drain(&mut self, now: Instant) -> bool {
        while let Ok(Completion { track, outcome }) = self.done_rx.try_recv() {
            self.outstanding = self.outstanding.saturating_sub(1);
            match outcome {
                Outcome::Ready => {
                    trace!("thumbnail: {} ready", track.title());
                    self.debounce.schedule(now);
                }
                Outcome::Failed(e) => {
                    warn!("thumbnail: {}: {e}", track.path().display());
                    self.debounce.schedule(now);
                }
                Outcome::Skipped => {}
            }
        }
        self.debounce.tick(now)
    }

    /// Stop accepting results. Queued tasks are skipped, running ones finish
    /// but their completions are dropped.
    pub fn shutdown(&mut self) {
        {
            let mut alive = self.ctx.alive.lock().unwrap_or_else(PoisonError::into_inner);
            if !*alive {
                return;
            }
            *alive = false;
        }
        self.pool.shutdown();
        while self.done_rx.try_recv().is_ok() {}
        self.outstanding = 0;
        self.debounce.cancel();
        debug!("thumbnails: shut down");
    }
}

impl Drop for ThumbnailPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
