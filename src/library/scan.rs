use std::path::{Path, PathBuf};

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::ItemKey;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::LibrarySettings;
use crate::source::{DEFAULT_SAMPLE_RATE_HZ, TrackRecord};

/// One playable file and what its tags say about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryTrack {
    pub path: PathBuf,
    pub record: TrackRecord,
}

pub(super) fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
        return false;
    };
    settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.'))
        .any(|e| !e.is_empty() && e.eq_ignore_ascii_case(ext))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Tags override the file name; unreadable files keep the fallbacks.
fn read_record(path: &Path) -> TrackRecord {
    let mut record = TrackRecord {
        title: path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string(),
        codec: path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_uppercase(),
        ..TrackRecord::EMPTY
    };

    let Ok(tagged) = lofty::read_from_path(path) else {
        debug!(path = %path.display(), "no readable tags");
        return record;
    };
    let properties = tagged.properties();
    record.duration_ms = u64::try_from(properties.duration().as_millis()).unwrap_or(u64::MAX);
    record.bitrate_bps = properties
        .audio_bitrate()
        .map_or(0, |kbps| kbps.saturating_mul(1_000));
    record.sample_rate_hz = properties.sample_rate().unwrap_or(DEFAULT_SAMPLE_RATE_HZ);

    if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
        let text = |key: ItemKey| {
            tag.get_string(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        if let Some(title) = text(ItemKey::TrackTitle) {
            record.title = title;
        }
        record.artist = text(ItemKey::TrackArtist).unwrap_or_default();
        record.album = text(ItemKey::AlbumTitle).unwrap_or_default();
    }
    record
}

/// Walk the music directory into a program ordered by path, so albums kept in
/// their own folders play in file order. `index` is the 1-based program
/// position.
pub fn scan(settings: &LibrarySettings) -> Vec<LibraryTrack> {
    let mut walker = WalkDir::new(&settings.music_dir).follow_links(settings.follow_links);
    if !settings.recursive {
        walker = walker.max_depth(1);
    }

    let mut paths: Vec<PathBuf> = walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_audio_file(e.path(), settings))
        .map(|e| e.into_path())
        .collect();
    paths.sort_by_key(|p| p.to_string_lossy().to_lowercase());

    paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| {
            let mut record = read_record(&path);
            record.index = u32::try_from(i + 1).unwrap_or(u32::MAX);
            LibraryTrack { path, record }
        })
        .collect()
}
