//! Centralized error type for the takeline umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] takeline_core::Error),

    #[error("Recording: {0}")]
    Recording(#[from] takeline_recording::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
