//! Disc drive access.
//!
//! The drive is read through a directory where the disc's tracks are
//! exposed as files (a cdfs-style mount or an equivalent FUSE view): audio
//! tracks as WAV images, data tracks as ISO images. File sizes give the
//! sector lengths, which in turn give the table of contents and the disc
//! fingerprint the lookup service is queried with.

use std::path::{Path, PathBuf};
use std::process::Command;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use lofty::file::TaggedFileExt;
use lofty::tag::ItemKey;
use sha1::{Digest, Sha1};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::DiscSettings;
use crate::error::{Result, SourceError};

/// Raw audio sector size (2352 bytes of 16-bit stereo PCM).
const AUDIO_SECTOR_BYTES: u64 = 2_352;
/// Mode-1 data sector payload.
const DATA_SECTOR_BYTES: u64 = 2_048;
/// RIFF/WAVE header prepended to each audio image.
const WAV_HEADER_BYTES: u64 = 44;
/// Two-second pregap before the first track.
pub const LEAD_IN_SECTORS: u32 = 150;
/// Gap between the audio session and a trailing data session.
pub const SESSION_GAP_SECTORS: u32 = 11_400;
pub const SECTORS_PER_SECOND: u64 = 75;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// Physical track number on the disc (1-based).
    pub number: u32,
    pub kind: TrackKind,
    /// Absolute start sector, lead-in included.
    pub offset: u32,
    pub sectors: u32,
}

impl TocEntry {
    pub fn duration_ms(&self) -> u64 {
        u64::from(self.sectors) * 1_000 / SECTORS_PER_SECOND
    }

    pub fn is_data(&self) -> bool {
        self.kind == TrackKind::Data
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscToc {
    pub entries: Vec<TocEntry>,
}

impl DiscToc {
    /// Lay out entries back to back from the lead-in, inserting the session
    /// gap when audio is followed by data.
    pub fn from_lengths(tracks: &[(u32, TrackKind, u32)]) -> Self {
        let mut offset = LEAD_IN_SECTORS;
        let mut prev_kind: Option<TrackKind> = None;
        let mut entries = Vec::with_capacity(tracks.len());
        for &(number, kind, sectors) in tracks {
            if prev_kind == Some(TrackKind::Audio) && kind == TrackKind::Data {
                offset += SESSION_GAP_SECTORS;
            }
            entries.push(TocEntry {
                number,
                kind,
                offset,
                sectors,
            });
            offset += sectors;
            prev_kind = Some(kind);
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// MusicBrainz disc id, computed over the audio session only.
    pub fn disc_id(&self) -> Option<String> {
        let audio: Vec<&TocEntry> = self.entries.iter().filter(|e| !e.is_data()).collect();
        let first = audio.first()?;
        let last = audio.last()?;

        let trailing_data = self
            .entries
            .iter()
            .find(|e| e.is_data() && e.offset > last.offset);
        let lead_out = match trailing_data {
            Some(data) => data.offset.saturating_sub(SESSION_GAP_SECTORS),
            None => last.offset + last.sectors,
        };

        let mut hex = format!("{:02X}{:02X}", first.number, last.number);
        let mut offsets = [0u32; 100];
        offsets[0] = lead_out;
        for e in &audio {
            if let Some(slot) = offsets.get_mut(e.number as usize) {
                *slot = e.offset;
            }
        }
        for o in offsets {
            hex.push_str(&format!("{o:08X}"));
        }

        let digest = Sha1::digest(hex.as_bytes());
        let id = STANDARD
            .encode(digest)
            .replace('+', ".")
            .replace('/', "_")
            .replace('=', "-");
        Some(id)
    }
}

/// Embedded disc text fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TextField {
    Title = 0,
    Performer = 1,
}

/// Everything the disc backend needs from the physical drive.
pub trait DiscDrive: Send {
    /// Cheap check used by insertion detection.
    fn media_present(&mut self) -> bool;
    fn read_toc(&mut self) -> Result<DiscToc>;
    fn disc_text(&mut self, track: u32, field: TextField) -> Option<String>;
    /// Location the engine plays `track` from.
    fn track_location(&self, track: u32) -> Option<PathBuf>;
    fn eject(&mut self) -> Result<()>;
}

pub struct MountedDrive {
    device: String,
    mount_dir: PathBuf,
    eject_command: String,
    tracks: Vec<(u32, TrackKind, PathBuf)>,
}

impl MountedDrive {
    pub fn new(settings: &DiscSettings) -> Self {
        Self {
            device: settings.device.clone(),
            mount_dir: settings.mount_dir.clone(),
            eject_command: settings.eject_command.clone(),
            tracks: Vec::new(),
        }
    }

    fn scan(&self) -> Vec<(u32, TrackKind, PathBuf, u64)> {
        let mut found: Vec<(u32, TrackKind, PathBuf, u64)> = WalkDir::new(&self.mount_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let path = e.path();
                let kind = track_kind(path)?;
                let number = track_number(path)?;
                let len = e.metadata().ok()?.len();
                Some((number, kind, path.to_path_buf(), len))
            })
            .collect();
        found.sort_by_key(|(n, ..)| *n);
        found.dedup_by_key(|(n, ..)| *n);
        found
    }
}

impl DiscDrive for MountedDrive {
    fn media_present(&mut self) -> bool {
        !self.scan().is_empty()
    }

    fn read_toc(&mut self) -> Result<DiscToc> {
        let found = self.scan();
        if found.is_empty() {
            return Err(SourceError::ResourceUnavailable(format!(
                "no disc in {}",
                self.mount_dir.display()
            )));
        }

        let lengths: Vec<(u32, TrackKind, u32)> = found
            .iter()
            .map(|(n, kind, _, len)| (*n, *kind, sectors_for(*kind, *len)))
            .collect();
        self.tracks = found.into_iter().map(|(n, kind, p, _)| (n, kind, p)).collect();

        let toc = DiscToc::from_lengths(&lengths);
        debug!(tracks = toc.len(), dir = %self.mount_dir.display(), "read disc toc");
        Ok(toc)
    }

    fn disc_text(&mut self, track: u32, field: TextField) -> Option<String> {
        let path = self.track_location(track)?;
        let tagged = lofty::read_from_path(&path).ok()?;
        let tag = tagged.primary_tag().or_else(|| tagged.first_tag())?;
        let key = match field {
            TextField::Title => ItemKey::TrackTitle,
            TextField::Performer => ItemKey::TrackArtist,
        };
        tag.get_string(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn track_location(&self, track: u32) -> Option<PathBuf> {
        self.tracks
            .iter()
            .find(|(n, ..)| *n == track)
            .map(|(_, _, p)| p.clone())
    }

    fn eject(&mut self) -> Result<()> {
        self.tracks.clear();
        let status = Command::new(&self.eject_command).arg(&self.device).status()?;
        if !status.success() {
            warn!(device = %self.device, %status, "eject command failed");
            return Err(SourceError::ResourceUnavailable(format!(
                "eject of {} exited with {status}",
                self.device
            )));
        }
        Ok(())
    }
}

fn track_kind(path: &Path) -> Option<TrackKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "wav" | "cdda" => Some(TrackKind::Audio),
        "iso" | "bin" => Some(TrackKind::Data),
        _ => None,
    }
}

/// Track number from the digits in a file stem: `track-03.wav`, `03.iso`.
fn track_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().filter(|n| *n > 0)
}

fn sectors_for(kind: TrackKind, len: u64) -> u32 {
    let sectors = match kind {
        TrackKind::Audio => len.saturating_sub(WAV_HEADER_BYTES) / AUDIO_SECTOR_BYTES,
        TrackKind::Data => len / DATA_SECTOR_BYTES,
    };
    u32::try_from(sectors).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn drive_at(dir: &Path) -> MountedDrive {
        let settings = DiscSettings {
            mount_dir: dir.to_path_buf(),
            ..DiscSettings::default()
        };
        MountedDrive::new(&settings)
    }

    #[test]
    fn track_numbers_come_from_stem_digits() {
        assert_eq!(track_number(Path::new("/d/track-03.wav")), Some(3));
        assert_eq!(track_number(Path::new("/d/12.iso")), Some(12));
        assert_eq!(track_number(Path::new("/d/readme.wav")), None);
        assert_eq!(track_number(Path::new("/d/track00.wav")), None);
    }

    #[test]
    fn empty_mount_has_no_media() {
        let dir = tempdir().unwrap();
        let mut drive = drive_at(dir.path());
        assert!(!drive.media_present());
        assert!(matches!(
            drive.read_toc(),
            Err(SourceError::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn toc_classifies_and_measures_track_images() {
        let dir = tempdir().unwrap();
        let audio_len = WAV_HEADER_BYTES + AUDIO_SECTOR_BYTES * 750;
        fs::write(dir.path().join("track01.wav"), vec![0u8; audio_len as usize]).unwrap();
        fs::write(dir.path().join("track02.iso"), vec![0u8; 2_048 * 10]).unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut drive = drive_at(dir.path());
        assert!(drive.media_present());
        let toc = drive.read_toc().unwrap();

        assert_eq!(toc.len(), 2);
        assert_eq!(toc.entries[0].kind, TrackKind::Audio);
        assert_eq!(toc.entries[0].sectors, 750);
        assert_eq!(toc.entries[0].duration_ms(), 10_000);
        assert_eq!(toc.entries[0].offset, LEAD_IN_SECTORS);
        assert_eq!(toc.entries[1].kind, TrackKind::Data);
        assert_eq!(
            toc.entries[1].offset,
            LEAD_IN_SECTORS + 750 + SESSION_GAP_SECTORS
        );
        assert!(drive.track_location(1).unwrap().ends_with("track01.wav"));
        assert!(drive.track_location(3).is_none());
    }

    #[test]
    fn disc_id_has_musicbrainz_shape_and_ignores_data_session() {
        let audio_only = DiscToc::from_lengths(&[
            (1, TrackKind::Audio, 15_000),
            (2, TrackKind::Audio, 20_000),
        ]);
        let enhanced = DiscToc::from_lengths(&[
            (1, TrackKind::Audio, 15_000),
            (2, TrackKind::Audio, 20_000),
            (3, TrackKind::Data, 5_000),
        ]);

        let id = audio_only.disc_id().unwrap();
        assert_eq!(id.len(), 28);
        assert!(id.ends_with('-'));
        assert!(!id.contains('+') && !id.contains('/'));
        assert_eq!(enhanced.disc_id().unwrap(), id);
    }

    #[test]
    fn data_only_disc_has_no_id() {
        let toc = DiscToc::from_lengths(&[(1, TrackKind::Data, 100)]);
        assert!(toc.disc_id().is_none());
    }
}
