use tracing::{debug, info};

use crate::audio::{MediaEngine, PlayableItem, RodioEngine};
use crate::config::LibrarySettings;
use crate::error::{Result, SourceError};
use crate::source::{Notice, PlaybackStatus, Source, SourceId, TrackRecord};

use super::scan::{LibraryTrack, scan};

const NO_FILES_NOTICE_MS: u64 = 3_000;

/// `prev` restarts the current track once it has played this long.
const RESTART_THRESHOLD_MS: u64 = 5_000;

/// Backend over a local music directory, rescanned on every load.
pub struct FileSource {
    settings: LibrarySettings,
    engine: Box<dyn MediaEngine>,
    tracks: Vec<LibraryTrack>,
    loaded: bool,
    status: PlaybackStatus,
    track: TrackRecord,
    shuffle: bool,
    repeat: bool,
    notice: Notice,
}

impl FileSource {
    pub fn new(settings: LibrarySettings, engine: Box<dyn MediaEngine>) -> Self {
        Self {
            settings,
            engine,
            tracks: Vec::new(),
            loaded: false,
            status: PlaybackStatus::Idle,
            track: TrackRecord::EMPTY,
            shuffle: false,
            repeat: false,
            notice: Notice::none(),
        }
    }

    pub fn from_settings(settings: &LibrarySettings) -> Result<Self> {
        let engine = RodioEngine::spawn()?;
        Ok(Self::new(settings.clone(), Box::new(engine)))
    }

    /// The engine's current track, or the first one before anything played.
    fn record_at(&self, index: Option<usize>) -> TrackRecord {
        self.tracks
            .get(index.unwrap_or(0))
            .map_or(TrackRecord::EMPTY, |t| t.record.clone())
    }
}

impl Source for FileSource {
    fn id(&self) -> SourceId {
        SourceId::File
    }

    fn load(&mut self) {
        if self.loaded {
            self.unload();
        }
        self.status = PlaybackStatus::Loading;

        self.tracks = scan(&self.settings);
        let items = self
            .tracks
            .iter()
            .map(|t| PlayableItem {
                location: t.path.clone(),
                duration_ms: t.record.duration_ms,
            })
            .collect();
        self.engine.set_items(items);
        self.engine.set_looping(self.repeat);
        self.engine.set_shuffle(self.shuffle);

        self.loaded = true;
        self.status = PlaybackStatus::Stopped;
        self.track = self.record_at(None);
        self.notice = if self.tracks.is_empty() {
            Notice::new("NO FILES", NO_FILES_NOTICE_MS)
        } else {
            Notice::none()
        };
        info!(
            tracks = self.tracks.len(),
            dir = %self.settings.music_dir.display(),
            "music library loaded"
        );
    }

    fn unload(&mut self) {
        self.engine.stop();
        self.engine.clear();
        self.tracks.clear();
        self.loaded = false;
        self.status = PlaybackStatus::Idle;
        self.track = TrackRecord::EMPTY;
        self.notice = Notice::none();
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn play(&mut self) {
        if self.loaded {
            self.engine.play();
        }
    }

    fn stop(&mut self) {
        if self.loaded {
            self.engine.stop();
        }
    }

    fn pause(&mut self) {
        if self.loaded {
            self.engine.pause();
        }
    }

    fn next(&mut self) {
        if self.loaded {
            self.engine.next();
        }
    }

    fn prev(&mut self) {
        if !self.loaded {
            return;
        }
        if self.position() > RESTART_THRESHOLD_MS {
            self.engine.set_position(0.0);
        } else {
            self.engine.previous();
        }
    }

    fn seek(&mut self, ms: u64) {
        if !self.loaded {
            return;
        }
        let Some(index) = self.engine.snapshot().index else {
            return;
        };
        let duration_ms = self.tracks.get(index).map_or(0, |t| t.record.duration_ms);
        if duration_ms == 0 {
            debug!(index, "seek skipped, track length unknown");
            return;
        }
        let fraction = (ms as f64 / duration_ms as f64).clamp(0.0, 1.0);
        self.engine.set_position(fraction);
    }

    fn jump(&mut self, index: usize) {
        if self.loaded && index < self.tracks.len() {
            self.engine.jump_to(index);
        }
    }

    fn set_shuffle(&mut self, enabled: bool) {
        self.shuffle = enabled;
        self.engine.set_shuffle(enabled);
    }

    fn set_repeat(&mut self, enabled: bool) {
        self.repeat = enabled;
        self.engine.set_looping(enabled);
    }

    fn eject(&mut self) {
        debug!(error = %SourceError::Unsupported, "file eject");
        self.notice = Notice::not_supported();
    }

    fn position(&self) -> u64 {
        if !self.loaded {
            return 0;
        }
        self.engine.snapshot().position_ms
    }

    fn shuffle(&self) -> bool {
        self.shuffle
    }

    fn repeat(&self) -> bool {
        self.repeat
    }

    fn status(&self) -> PlaybackStatus {
        self.status
    }

    fn track(&self) -> TrackRecord {
        self.track.clone()
    }

    fn program(&self) -> Vec<TrackRecord> {
        self.tracks.iter().map(|t| t.record.clone()).collect()
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
        let snapshot = self.engine.snapshot();
        let status = snapshot.state.to_status();
        if status != self.status {
            debug!(from = %self.status, to = %status, "file status changed");
            if let Some(notice) = snapshot.state.notice() {
                self.notice = notice;
            }
        }
        self.status = status;
        self.track = self.record_at(snapshot.index);
        false
    }
}
