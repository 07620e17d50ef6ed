use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::RgbaImage;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Lifecycle of a track's preview image.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ThumbnailState {
    #[default]
    NotRequested,
    Pending,
    Ready,
    Failed,
}

#[derive(Debug, Default)]
struct SlotInner {
    state: ThumbnailState,
    image: Option<Arc<RgbaImage>>,
    /// Bumped on every claim and invalidation; a write must carry the
    /// generation it claimed.
    generation: u64,
}

/// Lock-guarded preview cell shared between the worker pool and the
/// control thread.
///
/// Readers get an `Arc` to the image and the lock is released before the
/// caller does anything with it.
#[derive(Debug, Default)]
pub struct ThumbnailSlot {
    inner: Mutex<SlotInner>,
}

impl ThumbnailSlot {
    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        // A worker that panicked mid-write leaves the slot in a state we can still read.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ThumbnailState {
        self.lock().state
    }

    /// Copy out the current image handle, if any.
    pub fn image(&self) -> Option<Arc<RgbaImage>> {
        self.lock().image.clone()
    }

    /// Claim the slot for generation: `NotRequested -> Pending`.
    ///
    /// Returns the claim token, or `None` when the slot is already pending,
    /// ready or failed, in which case the caller must not generate.
    pub fn try_begin(&self) -> Option<u64> {
        let mut inner = self.lock();
        if inner.state != ThumbnailState::NotRequested {
            return None;
        }
        inner.generation += 1;
        inner.state = ThumbnailState::Pending;
        Some(inner.generation)
    }

    /// Store a finished preview: `Pending -> Ready`.
    ///
    /// Ignored unless the slot is still pending under the same claim, so a
    /// worker whose slot was invalidated (and possibly claimed again) while
    /// it was busy cannot overwrite it with stale output.
    pub fn complete(&self, claim: u64, image: RgbaImage) -> bool {
        let mut inner = self.lock();
        if !inner.holds(claim) {
            return false;
        }
        inner.image = Some(Arc::new(image));
        inner.state = ThumbnailState::Ready;
        true
    }

    /// Record a failed extraction: `Pending -> Failed`.
    pub fn fail(&self, claim: u64) -> bool {
        let mut inner = self.lock();
        if !inner.holds(claim) {
            return false;
        }
        inner.state = ThumbnailState::Failed;
        true
    }

    /// Drop any preview and allow generation again. Outstanding claims
    /// become stale.
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        inner.image = None;
        inner.state = ThumbnailState::NotRequested;
        inner.generation += 1;
    }
}

impl SlotInner {
    fn holds(&self, claim: u64) -> bool {
        self.state == ThumbnailState::Pending && self.generation == claim
    }
}

/// One scanned media file. Identity never changes after creation; only the
/// preview slot is mutable.
#[derive(Debug)]
pub struct Track {
    path: PathBuf,
    title: String,
    kind: MediaKind,
    thumbnail: ThumbnailSlot,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        let path = path.into();
        let title = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            title,
            kind,
            thumbnail: ThumbnailSlot::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display title: the file name, extension included.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn thumbnail(&self) -> &ThumbnailSlot {
        &self.thumbnail
    }
}

/// Shared handle to a track. Views and thumbnail tasks hold these, never copies.
pub type TrackRef = Arc<Track>;

/// Sort tracks by case-insensitive title, the master list order.
pub fn sort_by_title(tracks: &mut [TrackRef]) {
    tracks.sort_by(|a, b| a.title().to_lowercase().cmp(&b.title().to_lowercase()));
}
