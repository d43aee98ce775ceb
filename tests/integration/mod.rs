//! Integration test modules for takeline
//!
//! Test categories:
//! - pipeline: producer to project, one cycle at a time on the test thread
//! - worker: concurrent audio threads with the background drain thread

pub mod pipeline;
#[cfg(feature = "worker")]
pub mod worker;
