//! The playback contract shared by every backend.
//!
//! `model` holds the normalized track/notice/status types, `position` the
//! extrapolating clock used by push-based backends.

mod model;
mod position;

pub use model::*;
pub use position::PositionClock;

/// One playback origin, driven by the UI thread.
///
/// None of these operations report failures to the caller: a backend that
/// cannot do something degrades its status or raises a [`Notice`] instead.
pub trait Source: Send {
    fn id(&self) -> SourceId;

    /// Acquire the backend's resources. Calling it while loaded unloads first.
    fn load(&mut self);
    /// Release resources and reset to the empty record and `Idle`.
    fn unload(&mut self);
    fn is_loaded(&self) -> bool;

    fn play(&mut self);
    fn stop(&mut self);
    fn pause(&mut self);
    fn next(&mut self);
    fn prev(&mut self);
    fn seek(&mut self, ms: u64);
    /// Jump to a 0-based position in [`Source::program`].
    fn jump(&mut self, index: usize);
    fn set_shuffle(&mut self, enabled: bool);
    fn set_repeat(&mut self, enabled: bool);
    fn eject(&mut self);

    fn position(&self) -> u64;
    fn shuffle(&self) -> bool;
    fn repeat(&self) -> bool;
    fn status(&self) -> PlaybackStatus;
    fn track(&self) -> TrackRecord;
    /// Playable listing, if the backend has one.
    fn program(&self) -> Vec<TrackRecord> {
        Vec::new()
    }
    fn notice(&self) -> Notice;
    fn clear_notice(&mut self);

    /// Refresh from the backend's latest snapshot. Returns true when the UI
    /// should redraw immediately.
    fn poll(&mut self) -> bool;
}
