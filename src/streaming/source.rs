use std::time::Instant;

use tracing::{debug, info};

use crate::config::StreamingSettings;
use crate::error::{Result, SourceError};
use crate::source::{CONNECTION_NOTICE_MS, Notice, PlaybackStatus, Source, SourceId, TrackRecord};

use super::events::{SharedEvents, StreamingState};
use super::service::EventService;

/// Streaming client backend. Playback is controlled from the client's own
/// app; this side only displays what the event stream reports.
pub struct StreamingSource {
    shared: SharedEvents,
    _service: Option<EventService>,
    loaded: bool,
    state: StreamingState,
    track: TrackRecord,
    notice: Notice,
}

impl StreamingSource {
    /// Read events from `shared` without exporting anything.
    pub fn with_events(shared: SharedEvents) -> Self {
        Self {
            shared,
            _service: None,
            loaded: false,
            state: StreamingState::disconnected(Instant::now()),
            track: TrackRecord::EMPTY,
            notice: Notice::none(),
        }
    }

    pub fn from_settings(settings: &StreamingSettings) -> Result<Self> {
        let shared = StreamingState::shared();
        let service = EventService::spawn(settings, shared.clone())?;
        Ok(Self {
            _service: Some(service),
            ..Self::with_events(shared)
        })
    }

    fn snapshot(&self) -> StreamingState {
        self.shared
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|_| StreamingState::disconnected(Instant::now()))
    }

    fn connection_notice(&mut self) {
        let text = if self.state.connected {
            "CONNECTED"
        } else {
            "DISCONNECTED"
        };
        self.notice = Notice::new(text, CONNECTION_NOTICE_MS);
    }

    fn apply(&mut self, next: StreamingState) {
        self.track = if next.connected && next.track.has_metadata() {
            next.track.clone()
        } else {
            TrackRecord::EMPTY
        };
        self.state = next;
    }

    fn unsupported(&mut self, op: &str) {
        debug!(op, error = %SourceError::Unsupported, "streaming");
        self.notice = Notice::not_supported();
    }
}

impl Source for StreamingSource {
    fn id(&self) -> SourceId {
        SourceId::Spotify
    }

    fn load(&mut self) {
        if self.loaded {
            self.unload();
        }
        self.loaded = true;
        let next = self.snapshot();
        self.apply(next);
        if !self.track.has_metadata() {
            self.connection_notice();
        }
        info!(connected = self.state.connected, "streaming source loaded");
    }

    fn unload(&mut self) {
        self.loaded = false;
        self.state = StreamingState::disconnected(Instant::now());
        self.track = TrackRecord::EMPTY;
        self.notice = Notice::none();
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn play(&mut self) {
        self.unsupported("play");
    }

    fn stop(&mut self) {
        self.unsupported("stop");
    }

    fn pause(&mut self) {
        self.unsupported("pause");
    }

    fn next(&mut self) {
        self.unsupported("next");
    }

    fn prev(&mut self) {
        self.unsupported("prev");
    }

    fn seek(&mut self, _ms: u64) {
        self.unsupported("seek");
    }

    fn jump(&mut self, _index: usize) {
        self.unsupported("jump");
    }

    fn set_shuffle(&mut self, _enabled: bool) {
        self.unsupported("set_shuffle");
    }

    fn set_repeat(&mut self, _enabled: bool) {
        self.unsupported("set_repeat");
    }

    fn eject(&mut self) {
        self.unsupported("eject");
    }

    fn position(&self) -> u64 {
        if !self.loaded {
            return 0;
        }
        self.state.position_at(Instant::now())
    }

    fn shuffle(&self) -> bool {
        self.loaded && self.state.shuffle
    }

    fn repeat(&self) -> bool {
        self.loaded && self.state.repeat
    }

    fn status(&self) -> PlaybackStatus {
        if !self.loaded {
            return PlaybackStatus::Idle;
        }
        self.state.status
    }

    fn track(&self) -> TrackRecord {
        self.track.clone()
    }

    fn notice(&self) -> Notice {
        self.notice.clone()
    }

    fn clear_notice(&mut self) {
        self.notice = Notice::none();
    }

    fn poll(&mut self) -> bool {
        if !self.loaded {
            return false;
        }
        let next = self.snapshot();
        if next.revision == self.state.revision && next.connected == self.state.connected {
            return false;
        }

        let was_connected = self.state.connected;
        let had_metadata = self.track.has_metadata();
        self.apply(next);

        let connected = self.state.connected;
        let has_metadata = self.track.has_metadata();
        if connected != was_connected {
            debug!(connected, "streaming session changed");
            if !has_metadata {
                self.connection_notice();
            }
        } else if had_metadata && !has_metadata {
            self.connection_notice();
        }
        connected && !was_connected
    }
}
