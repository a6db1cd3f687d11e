use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::BluetoothSettings;
use crate::error::{Result, SourceError};
use crate::source::{
    CONNECTION_NOTICE_MS, Notice, PlaybackStatus, PositionClock, Source, SourceId, TrackRecord,
};

use super::bus::{BluezLink, PlayerCommand, WirelessLink};
use super::state::{BluetoothState, mode_value};

/// How long a shuffle/repeat write wins over snapshots that do not reflect it.
const MODE_ECHO_TIMEOUT: Duration = Duration::from_secs(3);

/// A shuffle/repeat write the device has not echoed back yet.
#[derive(Debug, Clone, Copy)]
struct PendingMode {
    enabled: bool,
    deadline: Instant,
}

impl PendingMode {
    fn new(enabled: bool, now: Instant) -> Self {
        Self {
            enabled,
            deadline: now + MODE_ECHO_TIMEOUT,
        }
    }

    /// Apply the write to `native`, or return `None` once the device has
    /// confirmed it or the deadline has passed.
    fn overlay(self, native: &mut String, now: Instant) -> Option<Self> {
        let reported = (native.as_str() != mode_value(false)) == self.enabled;
        if reported || now >= self.deadline {
            return None;
        }
        *native = mode_value(self.enabled).to_string();
        Some(self)
    }
}

/// Bluetooth backend. Reads come from the last copied bus snapshot; controls
/// are queued to the bus thread.
pub struct WirelessSource {
    link: Box<dyn WirelessLink>,
    load_timeout: Duration,
    loaded: bool,
    state: BluetoothState,
    /// `state.track` when it carries metadata, the empty record otherwise.
    track: TrackRecord,
    clock: PositionClock,
    notice: Notice,
    pending_shuffle: Option<PendingMode>,
    pending_repeat: Option<PendingMode>,
}

impl WirelessSource {
    pub fn new(link: Box<dyn WirelessLink>, load_timeout: Duration) -> Self {
        Self {
            link,
            load_timeout,
            loaded: false,
            state: BluetoothState::disconnected(),
            track: TrackRecord::EMPTY,
            clock: PositionClock::stopped(),
            notice: Notice::none(),
            pending_shuffle: None,
            pending_repeat: None,
        }
    }

    pub fn from_settings(settings: &BluetoothSettings) -> Result<Self> {
        let link = BluezLink::spawn(settings)?;
        Ok(Self::new(
            Box::new(link),
            Duration::from_millis(settings.load_timeout_ms),
        ))
    }

    fn connection_notice(&mut self) {
        let text = match (&self.state.connected, &self.state.device_alias) {
            (true, Some(alias)) => format!("CONNECTED TO: {alias}"),
            (true, None) => "CONNECTED".to_string(),
            (false, _) => "DISCONNECTED".to_string(),
        };
        self.notice = Notice::new(text, CONNECTION_NOTICE_MS);
    }

    fn apply(&mut self, next: BluetoothState, now: Instant) {
        // Rebase only on news from the device; otherwise keep extrapolating.
        // BlueZ leaves Position stale across a bare status change.
        let running = next.playback_status() == PlaybackStatus::Playing;
        if next.position_ms != self.state.position_ms || next.track != self.state.track {
            self.clock = PositionClock::new(next.position_ms, now, running);
        } else if next.status != self.state.status {
            self.clock.set_running(running, now);
        }
        self.track = if next.connected && next.track.has_metadata() {
            next.track.clone()
        } else {
            TrackRecord::EMPTY
        };
        self.state = next;
    }

    /// Keep unconfirmed shuffle/repeat writes visible in `next`.
    fn overlay_pending(&mut self, next: &mut BluetoothState, now: Instant) {
        if !next.connected {
            self.pending_shuffle = None;
            self.pending_repeat = None;
            return;
        }
        self.pending_shuffle = self
            .pending_shuffle
            .and_then(|p| p.overlay(&mut next.shuffle, now));
        self.pending_repeat = self
            .pending_repeat
            .and_then(|p| p.overlay(&mut next.repeat, now));
    }

    /// `poll()` against an explicit clock.
    pub(super) fn poll_at(&mut self, now: Instant) -> bool {
        if !self.loaded {
            return false;
        }
        self.link.request_refresh();
        let mut next = self.link.latest();
        self.overlay_pending(&mut next, now);
        if next == self.state {
            return false;
        }

        let was_connected = self.state.connected;
        let had_metadata = self.track.has_metadata();
        self.apply(next, now);

        let connected = self.state.connected;
        let has_metadata = self.track.has_metadata();
        if connected != was_connected {
            debug!(connected, "bluetooth connection changed");
            if !has_metadata {
                self.connection_notice();
            }
        } else if had_metadata && !has_metadata {
            self.connection_notice();
        }
        connected && !was_connected
    }

    fn command(&mut self, cmd: PlayerCommand) {
        if !self.loaded {
            return;
        }
        self.link.send(cmd);
    }

    fn unsupported(&mut self, op: &str) {
        debug!(op, error = %SourceError::Unsupported, "bluetooth");
        self.notice = Notice::not_supported();
    }
}

impl Source for WirelessSource {
    fn id(&self) -> SourceId {
        SourceId::Bluetooth
    }

    fn load(&mut self) {
        if self.loaded {
            self.unload();
        }
        let next = match self.link.refresh(self.load_timeout) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "bluetooth refresh failed on load");
                self.link.latest()
            }
        };
        self.loaded = true;
        self.apply(next, Instant::now());
        if !self.track.has_metadata() {
            self.connection_notice();
        }
        info!(
            connected = self.state.connected,
            device = ?self.state.device_alias,
            "bluetooth source loaded"
        );
    }

    fn unload(&mut self) {
        self.loaded = false;
        self.state = BluetoothState::disconnected();
        self.track = TrackRecord::EMPTY;
        self.clock = PositionClock::stopped();
        self.notice = Notice::none();
        self.pending_shuffle = None;
        self.pending_repeat = None;
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn play(&mut self) {
        self.command(PlayerCommand::Play);
    }

    fn stop(&mut self) {
        self.command(PlayerCommand::Stop);
    }

    fn pause(&mut self) {
        self.command(PlayerCommand::Pause);
    }

    fn next(&mut self) {
        self.command(PlayerCommand::Next);
    }

    fn prev(&mut self) {
        self.command(PlayerCommand::Previous);
    }

    fn seek(&mut self, _ms: u64) {
        self.unsupported("seek");
    }

    fn jump(&mut self, _index: usize) {
        self.unsupported("jump");
    }

    fn set_shuffle(&mut self, enabled: bool) {
        if !self.loaded || !self.state.connected {
            return;
        }
        self.link.send(PlayerCommand::SetShuffle(enabled));
        self.state.shuffle = mode_value(enabled).to_string();
        self.pending_shuffle = Some(PendingMode::new(enabled, Instant::now()));
    }

    fn set_repeat(&mut self, enabled: bool) {
        if !self.loaded || !self.state.connected {
            return;
        }
        self.link.send(PlayerCommand::SetRepeat(enabled));
        self.state.repeat = mode_value(enabled).to_string();
        self.pending_repeat = Some(PendingMode::new(enabled, Instant::now()));
    }

    fn eject(&mut self) {
        self.unsupported("eject");
    }

    fn position(&self) -> u64 {
        if !self.loaded {
            return 0;
        }
        self.clock
            .position_capped(Instant::now(), self.track.duration_ms)
    }

    fn shuffle(&self) -> bool {
        self.loaded && self.state.shuffle_enabled()
    }

    fn repeat(&self) -> bool {
        self.loaded && self.state.repeat_enabled()
    }

    fn status(&self) -> PlaybackStatus {
        if !self.loaded {
            return PlaybackStatus::Idle;
        }
        if !self.state.connected {
            return PlaybackStatus::Stopped;
        }
        self.state.playback_status()
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
        self.poll_at(Instant::now())
    }
}
