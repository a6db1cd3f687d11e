//! Turns a table of contents plus whatever metadata could be found into the
//! per-track records the disc backend exposes.

use tracing::{debug, warn};

use crate::error::{Result, SourceError};
use crate::source::{DEFAULT_SAMPLE_RATE_HZ, TrackRecord};

use super::drive::{DiscDrive, DiscToc, TextField, TocEntry};
use super::lookup::{LookupResult, LookupTrack};

/// Red Book audio: 44.1 kHz, 16 bit, stereo.
pub const CD_BITRATE_BPS: u32 = 1_411_000;
pub const CD_CODEC: &str = "PCM";

const VARIOUS_ARTISTS: &str = "Various Artists";
const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramTrack {
    pub number: u32,
    pub is_data: bool,
    pub record: TrackRecord,
}

fn placeholder_title(position: usize, entry: &TocEntry) -> String {
    if entry.is_data() {
        "Data Track".to_string()
    } else {
        format!("Track {}", position + 1)
    }
}

fn make_record(entry: &TocEntry, artist: String, album: String, title: String, duration_ms: u64) -> ProgramTrack {
    let (codec, bitrate_bps) = if entry.is_data() {
        (String::new(), 0)
    } else {
        (CD_CODEC.to_string(), CD_BITRATE_BPS)
    };
    ProgramTrack {
        number: entry.number,
        is_data: entry.is_data(),
        record: TrackRecord {
            index: entry.number,
            artist,
            album,
            title,
            duration_ms,
            codec,
            bitrate_bps,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
        },
    }
}

/// Build the full program, data tracks included.
///
/// A failed lookup falls back to the disc's embedded text. Tracks the lookup
/// did not cover get a placeholder title and zero duration.
pub fn build_program(
    toc: &DiscToc,
    lookup: Result<LookupResult>,
    drive: &mut dyn DiscDrive,
) -> Vec<ProgramTrack> {
    match lookup {
        Ok(LookupResult::Release {
            artist,
            album,
            tracks,
        }) => from_lookup(toc, &artist, &album, &tracks, drive),
        Ok(LookupResult::Stub { artist, album }) => from_lookup(toc, &artist, &album, &[], drive),
        Err(e) => {
            warn!(error = %e, "disc lookup failed, using embedded disc text");
            from_disc_text(toc, drive)
        }
    }
}

fn from_lookup(
    toc: &DiscToc,
    artist: &str,
    album: &str,
    tracks: &[LookupTrack],
    drive: &mut dyn DiscDrive,
) -> Vec<ProgramTrack> {
    let compilation = artist == VARIOUS_ARTISTS;
    let mut gaps = 0usize;

    let program: Vec<ProgramTrack> = toc
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let found = tracks.get(i);
            let title = match found.and_then(|t| t.title.clone()) {
                Some(t) => t,
                None => {
                    gaps += 1;
                    placeholder_title(i, entry)
                }
            };
            let duration_ms = found.and_then(|t| t.length_ms).unwrap_or(0);

            let mut track_artist = artist.to_string();
            if compilation {
                if let Some(performer) = drive.disc_text(entry.number, TextField::Performer) {
                    track_artist = performer;
                }
            }
            make_record(entry, track_artist, album.to_string(), title, duration_ms)
        })
        .collect();

    if gaps > 0 {
        let partial = SourceError::PartialData(format!(
            "{gaps} of {} tracks not matched",
            toc.len()
        ));
        warn!(error = %partial, "using placeholder titles");
    }
    program
}

fn from_disc_text(toc: &DiscToc, drive: &mut dyn DiscDrive) -> Vec<ProgramTrack> {
    toc.entries
        .iter()
        .map(|entry| {
            let title = drive.disc_text(entry.number, TextField::Title);
            let performer = drive.disc_text(entry.number, TextField::Performer);
            let (title, artist) = match title {
                Some(t) => (t, performer.unwrap_or_default()),
                None => (format!("Track {}", entry.number), UNKNOWN.to_string()),
            };
            debug!(track = entry.number, %title, "disc text");
            make_record(entry, artist, UNKNOWN.to_string(), title, entry.duration_ms())
        })
        .collect()
}
