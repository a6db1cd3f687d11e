//! The playback engine contract shared by the file-backed sources, and the
//! `rodio` worker that implements it.

mod player;
mod sink;
mod thread;

use std::path::PathBuf;

use crate::source::{Notice, PlaybackStatus};

const LOADING_NOTICE_MS: u64 = 5_000;
const ERROR_NOTICE_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableItem {
    pub location: PathBuf,
    pub duration_ms: u64,
}

/// Engine-native player states.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    NothingSpecial,
    Opening,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Ended,
    Error,
}

impl EngineState {
    pub fn to_status(self) -> PlaybackStatus {
        match self {
            EngineState::Playing => PlaybackStatus::Playing,
            EngineState::Paused => PlaybackStatus::Paused,
            EngineState::Opening | EngineState::Buffering => PlaybackStatus::Loading,
            EngineState::Error => PlaybackStatus::Error,
            EngineState::NothingSpecial | EngineState::Stopped | EngineState::Ended => {
                PlaybackStatus::Stopped
            }
        }
    }

    /// Notice raised on entering this state. `Some(Notice::none())` clears the
    /// current one, `None` leaves it alone.
    pub fn notice(self) -> Option<Notice> {
        match self {
            EngineState::Error => Some(Notice::new("ERROR", ERROR_NOTICE_MS)),
            EngineState::Opening | EngineState::Buffering => {
                Some(Notice::new("LOADING...", LOADING_NOTICE_MS))
            }
            EngineState::Playing | EngineState::Paused => Some(Notice::none()),
            EngineState::NothingSpecial | EngineState::Stopped | EngineState::Ended => None,
        }
    }
}

/// What the engine last published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub state: EngineState,
    /// Index into the item list, if one is current.
    pub index: Option<usize>,
    pub position_ms: u64,
}

pub trait MediaEngine: Send {
    fn set_items(&mut self, items: Vec<PlayableItem>);
    fn clear(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn next(&mut self);
    fn previous(&mut self);
    fn jump_to(&mut self, index: usize);
    /// Seek within the current item, `fraction` in `0.0..=1.0`.
    fn set_position(&mut self, fraction: f64);
    /// Loop the whole item list.
    fn set_looping(&mut self, enabled: bool);
    fn set_shuffle(&mut self, enabled: bool);
    fn snapshot(&self) -> EngineSnapshot;
}

pub use player::RodioEngine;

#[cfg(test)]
pub mod testing;
