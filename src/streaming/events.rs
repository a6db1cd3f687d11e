use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::source::{DEFAULT_SAMPLE_RATE_HZ, PlaybackStatus, TrackRecord};

/// Nominal bitrate of the streaming service's high quality tier.
pub const STREAMING_BITRATE_BPS: u32 = 320_000;

/// Snapshot written by the bus service and copied out by `poll()`.
pub type SharedEvents = Arc<Mutex<StreamingState>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingState {
    pub connected: bool,
    pub status: PlaybackStatus,
    pub track: TrackRecord,
    /// Position reported by the last event that carried one.
    pub position_ms: u64,
    /// When `position_ms` was observed.
    pub observed_at: Instant,
    pub shuffle: bool,
    pub repeat: bool,
    /// Bumped on every recognized event.
    pub revision: u64,
}

impl StreamingState {
    pub fn disconnected(now: Instant) -> Self {
        Self {
            connected: false,
            status: PlaybackStatus::Stopped,
            track: TrackRecord::EMPTY,
            position_ms: 0,
            observed_at: now,
            shuffle: false,
            repeat: false,
            revision: 0,
        }
    }

    pub fn shared() -> SharedEvents {
        Arc::new(Mutex::new(Self::disconnected(Instant::now())))
    }

    /// Extrapolated position, capped at the track duration when known.
    pub fn position_at(&self, now: Instant) -> u64 {
        let mut pos = self.position_ms;
        if self.status == PlaybackStatus::Playing {
            let elapsed = now.saturating_duration_since(self.observed_at);
            pos = pos.saturating_add(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        }
        if self.track.duration_ms > 0 {
            pos = pos.min(self.track.duration_ms);
        }
        pos
    }

    fn set_position(&mut self, position_ms: u64, now: Instant) {
        self.position_ms = position_ms;
        self.observed_at = now;
    }

    /// Pin the extrapolated position before the status stops advancing it.
    fn freeze_position(&mut self, now: Instant) {
        let pos = self.position_at(now);
        self.set_position(pos, now);
    }
}

fn text(data: &HashMap<String, String>, key: &str) -> String {
    data.get(key).cloned().unwrap_or_default()
}

fn number<T: std::str::FromStr + Default>(data: &HashMap<String, String>, key: &str) -> T {
    data.get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default()
}

fn flag(data: &HashMap<String, String>, key: &str) -> bool {
    data.get(key).is_some_and(|v| v == "true")
}

fn track_from_event(data: &HashMap<String, String>) -> TrackRecord {
    let mut track = TrackRecord {
        index: number(data, "number"),
        artist: text(data, "artists"),
        album: text(data, "album"),
        title: text(data, "name"),
        duration_ms: number(data, "duration_ms"),
        codec: String::new(),
        bitrate_bps: STREAMING_BITRATE_BPS,
        sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
    };
    if data.get("item_type").is_some_and(|t| t == "Episode") {
        track.index = 0;
        track.album = String::new();
        track.artist = text(data, "show_name");
    }
    track
}

/// Fold one event into `state`. Returns false for events this backend
/// does not know, which leave `state` untouched.
pub fn apply_event(state: &mut StreamingState, data: &HashMap<String, String>, now: Instant) -> bool {
    let Some(event) = data.get("event") else {
        return false;
    };
    match event.as_str() {
        "session_connected" => {}
        "session_disconnected" => {
            let revision = state.revision;
            *state = StreamingState::disconnected(now);
            state.revision = revision + 1;
            return true;
        }
        "shuffle_changed" => state.shuffle = flag(data, "shuffle"),
        "repeat_changed" => state.repeat = flag(data, "repeat"),
        "playing" => {
            state.status = PlaybackStatus::Playing;
            state.set_position(number(data, "position_ms"), now);
        }
        "paused" => {
            state.status = PlaybackStatus::Paused;
            state.set_position(number(data, "position_ms"), now);
        }
        "stopped" => {
            state.freeze_position(now);
            state.status = PlaybackStatus::Stopped;
        }
        "loading" => {
            state.freeze_position(now);
            state.status = PlaybackStatus::Loading;
        }
        "seeked" | "position_correction" => state.set_position(number(data, "position_ms"), now),
        "track_changed" => state.track = track_from_event(data),
        _ => return false,
    }
    state.connected = true;
    state.revision += 1;
    true
}
