//! The single owner of every backend and of the active selection.
//!
//! Exactly one source is loaded at a time: switching unloads the previous
//! one before loading the next. Every accessor falls back to the empty
//! record and `Idle` when nothing is selected.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info, warn};

use crate::source::{Notice, PlaybackStatus, Source, SourceId, TrackRecord};

#[derive(Default)]
pub struct SourceController {
    sources: BTreeMap<SourceId, Box<dyn Source>>,
    active: Option<SourceId>,
}

impl SourceController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a backend to the catalogue, replacing any with the same id.
    pub fn register(&mut self, source: Box<dyn Source>) {
        let id = source.id();
        if self.active == Some(id) {
            self.deselect();
        }
        debug!(source = %id, "source registered");
        self.sources.insert(id, source);
    }

    /// Registered ids in a stable order.
    pub fn available(&self) -> Vec<SourceId> {
        self.sources.keys().copied().collect()
    }

    pub fn active_id(&self) -> Option<SourceId> {
        self.active
    }

    /// Make `id` the active source. Reselecting the active source does nothing.
    pub fn select(&mut self, id: SourceId) {
        if self.active == Some(id) {
            debug!(source = %id, "source already active");
            return;
        }
        if !self.sources.contains_key(&id) {
            warn!(source = %id, "source not available");
            return;
        }
        self.deselect();

        let Some(source) = self.sources.get_mut(&id) else {
            return;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| source.load())) {
            Ok(()) => {
                self.active = Some(id);
                info!(source = %id, "source selected");
            }
            Err(_) => {
                error!(source = %id, "source panicked while loading, left unselected");
                reset_after_panic(id, source.as_mut());
            }
        }
    }

    /// Unload the active source, leaving nothing selected.
    pub fn deselect(&mut self) {
        let Some(id) = self.active.take() else {
            return;
        };
        let Some(source) = self.sources.get_mut(&id) else {
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| source.unload())).is_err() {
            error!(source = %id, "source panicked while unloading");
        } else {
            debug!(source = %id, "source unloaded");
        }
    }

    /// Poll the active source. True when the UI should redraw now.
    pub fn tick(&mut self) -> bool {
        self.active_mut().is_some_and(|s| s.poll())
    }

    fn active_ref(&self) -> Option<&dyn Source> {
        let id = self.active?;
        self.sources.get(&id).map(|s| s.as_ref())
    }

    fn active_mut(&mut self) -> Option<&mut (dyn Source + 'static)> {
        let id = self.active?;
        self.sources.get_mut(&id).map(|s| s.as_mut())
    }

    pub fn play(&mut self) {
        if let Some(s) = self.active_mut() {
            s.play();
        }
    }

    pub fn stop(&mut self) {
        if let Some(s) = self.active_mut() {
            s.stop();
        }
    }

    pub fn pause(&mut self) {
        if let Some(s) = self.active_mut() {
            s.pause();
        }
    }

    pub fn next(&mut self) {
        if let Some(s) = self.active_mut() {
            s.next();
        }
    }

    pub fn prev(&mut self) {
        if let Some(s) = self.active_mut() {
            s.prev();
        }
    }

    pub fn seek(&mut self, ms: u64) {
        if let Some(s) = self.active_mut() {
            s.seek(ms);
        }
    }

    pub fn jump(&mut self, index: usize) {
        if let Some(s) = self.active_mut() {
            s.jump(index);
        }
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        if let Some(s) = self.active_mut() {
            s.set_shuffle(enabled);
        }
    }

    pub fn set_repeat(&mut self, enabled: bool) {
        if let Some(s) = self.active_mut() {
            s.set_repeat(enabled);
        }
    }

    pub fn eject(&mut self) {
        if let Some(s) = self.active_mut() {
            s.eject();
        }
    }

    pub fn position(&self) -> u64 {
        self.active_ref().map_or(0, |s| s.position())
    }

    pub fn shuffle(&self) -> bool {
        self.active_ref().is_some_and(|s| s.shuffle())
    }

    pub fn repeat(&self) -> bool {
        self.active_ref().is_some_and(|s| s.repeat())
    }

    pub fn status(&self) -> PlaybackStatus {
        self.active_ref()
            .map_or(PlaybackStatus::Idle, |s| s.status())
    }

    pub fn track(&self) -> TrackRecord {
        self.active_ref().map_or(TrackRecord::EMPTY, |s| s.track())
    }

    pub fn program(&self) -> Vec<TrackRecord> {
        self.active_ref().map(|s| s.program()).unwrap_or_default()
    }

    pub fn notice(&self) -> Notice {
        self.active_ref().map_or_else(Notice::none, |s| s.notice())
    }

    pub fn clear_notice(&mut self) {
        if let Some(s) = self.active_mut() {
            s.clear_notice();
        }
    }
}

/// Put a source that panicked mid-load back into its empty state.
fn reset_after_panic(id: SourceId, source: &mut dyn Source) {
    if panic::catch_unwind(AssertUnwindSafe(|| source.unload())).is_err() {
        error!(source = %id, "source panicked again while resetting");
    }
}
