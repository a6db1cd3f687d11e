//! Streaming client backend.
//!
//! The streaming daemon pushes playback events to us as `SendEvent(a{ss})`
//! calls on an object this process exports on the session bus. `service`
//! owns that export, `events` folds each event into the shared snapshot and
//! `source` reads it.

mod events;
mod service;
mod source;

pub use source::StreamingSource;

#[cfg(test)]
pub use events::{SharedEvents, StreamingState, apply_event};

#[cfg(test)]
mod tests;
