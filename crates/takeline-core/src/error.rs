//! Error types for takeline-core.

use thiserror::Error;

/// Error type for takeline-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(String),

    #[error("Stale pool handle: slot {index}, generation {generation}")]
    StaleHandle { index: usize, generation: u32 },

    #[error("Free list rejected slot {0}")]
    FreeListOverflow(usize),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
