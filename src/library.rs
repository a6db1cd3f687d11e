//! Local music collection backend.
//!
//! `scan` walks the configured directory and reads each file's tags into a
//! track record; `source` plays the resulting program through the shared
//! `audio` engine.

mod scan;
mod source;

pub use source::FileSource;

#[cfg(test)]
mod tests;
