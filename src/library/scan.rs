use std::path::Path;
use std::sync::Arc;

use log::debug;
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::{MediaKind, Track, TrackRef, sort_by_title};

fn normalized(exts: &[String]) -> Vec<String> {
    exts.iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Classify `path` by extension. Video wins if an extension is in both lists.
pub(crate) fn media_kind(path: &Path, settings: &LibrarySettings) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if normalized(&settings.video_extensions).contains(&ext) {
        Some(MediaKind::Video)
    } else if normalized(&settings.audio_extensions).contains(&ext) {
        Some(MediaKind::Audio)
    } else {
        None
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Walk `dir` and build the master track list, sorted by case-insensitive title.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<TrackRef> {
    let mut tracks: Vec<TrackRef> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(kind) = media_kind(path, settings) {
            let abs = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            tracks.push(Arc::new(Track::new(abs, kind)));
        }
    }

    sort_by_title(&mut tracks);
    debug!("scanned {}: {} media file(s)", dir.display(), tracks.len());
    tracks
}
