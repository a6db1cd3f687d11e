use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{debug, info, warn};

use crate::audio::{MediaEngine, PlayableItem, RodioEngine};
use crate::config::DiscSettings;
use crate::error::{Result, SourceError};
use crate::source::{Notice, PlaybackStatus, Source, SourceId, TrackRecord};

use super::drive::{DiscDrive, DiscToc, MountedDrive};
use super::lookup::{LookupResult, MetadataLookup, MusicBrainzLookup};
use super::program::{ProgramTrack, build_program};

const LOADING_NOTICE_MS: u64 = 5_000;
const NO_DISC_NOTICE_MS: u64 = 3_000;
const EJECT_NOTICE_MS: u64 = 4_000;

/// A lookup running off the UI thread for a disc found by `poll()`.
struct PendingLoad {
    toc: DiscToc,
    rx: Receiver<Result<LookupResult>>,
}

/// Optical disc backend.
///
/// The full program, data tracks included, is kept so positions line up with
/// the drive's numbering; `playable` maps engine item indices back into it.
pub struct DiscSource {
    drive: Box<dyn DiscDrive>,
    engine: Box<dyn MediaEngine>,
    lookup: Option<Arc<dyn MetadataLookup>>,
    pending: Option<PendingLoad>,
    toc: DiscToc,
    program: Vec<ProgramTrack>,
    playable: Vec<usize>,
    loaded: bool,
    status: PlaybackStatus,
    track: TrackRecord,
    shuffle: bool,
    repeat: bool,
    notice: Notice,
    /// Whether the previous insertion check saw media.
    media_seen: bool,
}

impl DiscSource {
    pub fn new(
        drive: Box<dyn DiscDrive>,
        engine: Box<dyn MediaEngine>,
        lookup: Option<Box<dyn MetadataLookup>>,
    ) -> Self {
        Self {
            drive,
            engine,
            lookup: lookup.map(Arc::from),
            pending: None,
            toc: DiscToc::default(),
            program: Vec::new(),
            playable: Vec::new(),
            loaded: false,
            status: PlaybackStatus::Idle,
            track: TrackRecord::EMPTY,
            shuffle: false,
            repeat: false,
            notice: Notice::none(),
            media_seen: false,
        }
    }

    /// Build the backend against the real drive, `rodio` and MusicBrainz.
    pub fn from_settings(settings: &DiscSettings) -> Result<Self> {
        let engine = RodioEngine::spawn()?;
        let lookup: Option<Box<dyn MetadataLookup>> = if settings.lookup_enabled {
            Some(Box::new(MusicBrainzLookup::new(settings)?))
        } else {
            None
        };
        Ok(Self::new(
            Box::new(MountedDrive::new(settings)),
            Box::new(engine),
            lookup,
        ))
    }

    /// Edge-triggered: true only when media appears after a check that saw none.
    pub fn detect_insertion(&mut self) -> bool {
        if self.loaded || self.pending.is_some() {
            return false;
        }
        let present = self.drive.media_present();
        let inserted = present && !self.media_seen;
        self.media_seen = present;
        inserted
    }

    fn first_playable(&self) -> TrackRecord {
        self.playable
            .first()
            .and_then(|&p| self.program.get(p))
            .map(|t| t.record.clone())
            .unwrap_or(TrackRecord::EMPTY)
    }

    fn current_position(&self) -> Option<usize> {
        let index = self.engine.snapshot().index?;
        self.playable.get(index).copied()
    }

    fn require_disc(&mut self) -> bool {
        // A pending lookup keeps its LOADING... notice.
        if !self.loaded && self.pending.is_none() {
            self.notice = Notice::new("NO DISC", NO_DISC_NOTICE_MS);
        }
        self.loaded
    }

    fn read_toc(&mut self) -> Result<DiscToc> {
        let toc = self.drive.read_toc()?;
        if toc.is_empty() {
            return Err(SourceError::ResourceUnavailable("empty disc".to_string()));
        }
        self.media_seen = true;
        Ok(toc)
    }

    /// The lookup service and the id to ask it for, or why there is none.
    fn lookup_request(&self, toc: &DiscToc) -> Result<(Arc<dyn MetadataLookup>, String)> {
        match (&self.lookup, toc.disc_id()) {
            (Some(service), Some(id)) => Ok((service.clone(), id)),
            (None, _) => Err(SourceError::ResourceUnavailable(
                "metadata lookup disabled".to_string(),
            )),
            (_, None) => Err(SourceError::ResourceUnavailable(
                "no audio session to fingerprint".to_string(),
            )),
        }
    }

    fn begin_loading(&mut self) {
        self.status = PlaybackStatus::Loading;
        self.notice = Notice::new("LOADING...", LOADING_NOTICE_MS);
    }

    /// Read the disc and start its lookup on a worker thread. `poll()` picks
    /// up the answer.
    fn start_background_load(&mut self) {
        self.begin_loading();
        let toc = match self.read_toc() {
            Ok(toc) => toc,
            Err(e) => return self.load_failed(e),
        };
        let (service, id) = match self.lookup_request(&toc) {
            Ok(request) => request,
            Err(e) => return self.finish_load(toc, Err(e)),
        };

        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("disc-lookup".to_string())
            .spawn(move || {
                // The receiver is gone if the disc was unloaded meanwhile.
                let _ = tx.send(service.lookup(&id));
            });
        match spawned {
            Ok(_) => {
                debug!(tracks = toc.len(), "disc lookup started");
                self.pending = Some(PendingLoad { toc, rx });
            }
            Err(e) => self.finish_load(toc, Err(e.into())),
        }
    }

    /// Finish a background load once its lookup has answered.
    fn poll_pending(&mut self) -> bool {
        let Some(pending) = &self.pending else {
            return false;
        };
        let lookup = match pending.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(SourceError::Transient(
                "lookup worker exited without an answer".to_string(),
            )),
        };
        if let Some(pending) = self.pending.take() {
            self.finish_load(pending.toc, lookup);
        }
        true
    }

    fn finish_load(&mut self, toc: DiscToc, lookup: Result<LookupResult>) {
        self.install(toc, lookup);
        self.loaded = true;
        self.status = PlaybackStatus::Stopped;
        self.track = self.first_playable();
        self.notice = Notice::none();
        info!(
            tracks = self.program.len(),
            playable = self.playable.len(),
            album = %self.track.album,
            "disc loaded"
        );
    }

    fn load_failed(&mut self, e: SourceError) {
        warn!(error = %e, "disc load failed");
        self.unload();
        self.notice = Notice::new("NO DISC", NO_DISC_NOTICE_MS);
    }

    /// Merge the lookup into a program and hand its audio tracks to the engine.
    fn install(&mut self, toc: DiscToc, lookup: Result<LookupResult>) {
        let program = build_program(&toc, lookup, self.drive.as_mut());

        let mut items = Vec::new();
        let mut playable = Vec::new();
        for (pos, (track, entry)) in program.iter().zip(&toc.entries).enumerate() {
            if track.is_data {
                continue;
            }
            match self.drive.track_location(track.number) {
                Some(location) => {
                    items.push(PlayableItem {
                        location,
                        duration_ms: entry.duration_ms(),
                    });
                    playable.push(pos);
                }
                None => warn!(track = track.number, "no location for audio track"),
            }
        }

        self.engine.set_items(items);
        self.engine.set_looping(self.repeat);
        self.engine.set_shuffle(self.shuffle);
        self.toc = toc;
        self.program = program;
        self.playable = playable;
    }
}

impl Source for DiscSource {
    fn id(&self) -> SourceId {
        SourceId::Disc
    }

    fn load(&mut self) {
        if self.loaded || self.pending.is_some() {
            self.unload();
        }
        self.begin_loading();

        let toc = match self.read_toc() {
            Ok(toc) => toc,
            Err(e) => return self.load_failed(e),
        };
        let lookup = self
            .lookup_request(&toc)
            .and_then(|(service, id)| service.lookup(&id));
        self.finish_load(toc, lookup);
    }

    fn unload(&mut self) {
        self.pending = None;
        self.engine.stop();
        self.engine.clear();
        self.toc = DiscToc::default();
        self.program.clear();
        self.playable.clear();
        self.loaded = false;
        self.status = PlaybackStatus::Idle;
        self.track = TrackRecord::EMPTY;
        self.notice = Notice::none();
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn play(&mut self) {
        if self.require_disc() {
            self.engine.play();
        }
    }

    fn stop(&mut self) {
        if self.require_disc() {
            self.engine.stop();
        }
    }

    fn pause(&mut self) {
        if self.require_disc() {
            self.engine.pause();
        }
    }

    fn next(&mut self) {
        if self.require_disc() {
            self.engine.next();
        }
    }

    fn prev(&mut self) {
        if self.require_disc() {
            self.engine.previous();
        }
    }

    fn seek(&mut self, ms: u64) {
        if !self.require_disc() {
            return;
        }
        let Some(pos) = self.current_position() else {
            return;
        };
        let duration_ms = self.toc.entries.get(pos).map_or(0, |e| e.duration_ms());
        if duration_ms == 0 {
            return;
        }
        let fraction = (ms as f64 / duration_ms as f64).clamp(0.0, 1.0);
        self.engine.set_position(fraction);
    }

    fn jump(&mut self, index: usize) {
        if !self.require_disc() {
            return;
        }
        if index < self.playable.len() {
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
        self.engine.stop();
        let result = self.drive.eject();
        self.unload();
        match result {
            Ok(()) => {
                self.media_seen = false;
                self.notice = Notice::new("EJECTING...", EJECT_NOTICE_MS);
            }
            Err(e) => {
                warn!(error = %e, "eject failed");
                self.notice = Notice::new("EJECT FAILED", NO_DISC_NOTICE_MS);
            }
        }
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
        self.playable
            .iter()
            .filter_map(|&p| self.program.get(p))
            .map(|t| t.record.clone())
            .collect()
    }

    fn notice(&self) -> Notice {
        self.notice.clone()
    }

    fn clear_notice(&mut self) {
        self.notice = Notice::none();
    }

    fn poll(&mut self) -> bool {
        if self.pending.is_some() {
            return self.poll_pending();
        }
        if self.detect_insertion() {
            info!("disc inserted");
            self.start_background_load();
            return true;
        }
        if !self.loaded {
            return false;
        }
        if !self.drive.media_present() {
            info!("disc removed");
            self.unload();
            return true;
        }

        let snapshot = self.engine.snapshot();
        let status = snapshot.state.to_status();
        if status != self.status {
            debug!(from = %self.status, to = %status, "disc status changed");
            if let Some(notice) = snapshot.state.notice() {
                self.notice = notice;
            }
        }
        self.status = status;
        self.track = snapshot
            .index
            .and_then(|i| self.playable.get(i))
            .and_then(|&p| self.program.get(p))
            .map(|t| t.record.clone())
            .unwrap_or_else(|| self.first_playable());
        false
    }
}
