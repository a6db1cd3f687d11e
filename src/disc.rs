//! Optical disc backend.
//!
//! `drive` reads the table of contents and embedded text, `lookup` queries
//! the metadata directory, and `program` merges both into track records.
//! Tracks play through the shared `audio` engine.

mod drive;
mod lookup;
mod program;
mod source;

pub use source::DiscSource;
