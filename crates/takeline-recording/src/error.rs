//! Error types for takeline-recording.

use crate::model::{RegionId, TrackId};
use thiserror::Error;

/// Error type for recording operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Core(#[from] takeline_core::Error),

    #[error("Unknown track: {0}")]
    UnknownTrack(TrackId),

    #[error("Unknown region: {0}")]
    UnknownRegion(RegionId),

    #[error("Track {track} cannot record {event} events")]
    TrackKindMismatch { track: TrackId, event: &'static str },

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Non-contiguous {event} on {entity}: expected frame {expected}, got {actual}")]
    Gap {
        entity: String,
        event: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("Project model error: {0}")]
    Model(String),

    #[error("Undo error: {0}")]
    Undo(String),

    #[error("Failed to spawn recording worker")]
    WorkerSpawn(#[source] std::io::Error),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
