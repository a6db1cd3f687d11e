//! Error types used inside backends.
//!
//! These never cross the `Source` boundary: backends turn them into status
//! and notice changes. They exist so the plumbing underneath can use `?`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Error, Debug)]
pub enum SourceError {
    /// No disc, no paired device, no streaming session.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Metadata arrived but part of it could not be matched.
    #[error("partial data: {0}")]
    PartialData(String),

    #[error("operation not supported")]
    Unsupported,

    /// Failed this cycle; may succeed on the next poll.
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("bus error: {0}")]
    Bus(#[from] zbus::Error),

    #[error("bus error: {0}")]
    BusFdo(#[from] zbus::fdo::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed lookup response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The playback engine failed to start.
    #[error("engine error: {0}")]
    Engine(String),
}

impl SourceError {
    /// Whether retrying on a later poll might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Transient(_) | SourceError::Bus(_) | SourceError::BusFdo(_) | SourceError::Http(_)
        )
    }
}
