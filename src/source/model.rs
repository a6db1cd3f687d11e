use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Sample rate reported when a backend has nothing better to offer.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;

/// Advisory lifetime of the "NOT SUPPORTED" notice.
pub const UNSUPPORTED_NOTICE_MS: u64 = 3_000;

/// Advisory lifetime of connection/disconnection notices.
pub const CONNECTION_NOTICE_MS: u64 = 5_000;

/// Backend-agnostic description of what is playing.
///
/// Records are replaced wholesale on every refresh; nothing in the crate
/// patches a field of a record another component may be reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    /// 1-based position within the current program, 0 when unknown.
    pub index: u32,
    pub artist: String,
    pub album: String,
    pub title: String,
    /// 0 when unknown.
    pub duration_ms: u64,
    pub codec: String,
    /// 0 when unknown.
    pub bitrate_bps: u32,
    pub sample_rate_hz: u32,
}

impl TrackRecord {
    /// The canonical "no track" record.
    pub const EMPTY: TrackRecord = TrackRecord {
        index: 0,
        artist: String::new(),
        album: String::new(),
        title: String::new(),
        duration_ms: 0,
        codec: String::new(),
        bitrate_bps: 0,
        sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
    };

    /// True for the sentinel: zero duration and no title.
    pub fn is_empty(&self) -> bool {
        self.duration_ms == 0 && self.title.is_empty()
    }

    /// Bus backends only trust metadata that comes with a duration.
    pub fn has_metadata(&self) -> bool {
        self.duration_ms > 0
    }
}

impl Default for TrackRecord {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A transient message a backend wants the UI to show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Notice {
    pub active: bool,
    pub text: String,
    /// Advisory expiry for the UI's own timer; 0 means the UI decides.
    pub timeout_ms: u64,
}

impl Notice {
    pub fn new(text: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            active: true,
            text: text.into(),
            timeout_ms,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn not_supported() -> Self {
        Self::new("NOT SUPPORTED", UNSUPPORTED_NOTICE_MS)
    }
}

/// Coarse playback state shared by every backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
    Stopped,
    Paused,
    Error,
    Loading,
}

impl PlaybackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Stopped => "stopped",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Error => "error",
            PlaybackStatus::Loading => "loading",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier of a registered backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum SourceId {
    Disc,
    Bluetooth,
    Spotify,
    File,
}

impl SourceId {
    pub const ALL: [SourceId; 4] = [
        SourceId::Disc,
        SourceId::Bluetooth,
        SourceId::Spotify,
        SourceId::File,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Disc => "disc",
            SourceId::Bluetooth => "bluetooth",
            SourceId::Spotify => "spotify",
            SourceId::File => "file",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disc" | "cd" => Ok(SourceId::Disc),
            "bluetooth" | "bt" => Ok(SourceId::Bluetooth),
            "spotify" | "streaming" => Ok(SourceId::Spotify),
            "file" | "files" | "local" => Ok(SourceId::File),
            other => Err(format!("unknown source id: {other}")),
        }
    }
}

impl TryFrom<String> for SourceId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
