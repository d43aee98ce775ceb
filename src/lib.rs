//! # Takeline - Real-time Recording Pipeline
//!
//! Moves what the audio thread records into a project model without ever
//! blocking or allocating on the audio thread.
//!
//! ## Architecture
//!
//! Takeline is an umbrella crate that coordinates:
//! - **takeline-core** - Lock-free building blocks (MPMC queue, object pool, atomics)
//! - **takeline-recording** - Recording events, producer, manager state machine,
//!   project model and undo interfaces, worker thread
//!
//! ## Quick Start
//!
//! ```
//! use takeline::prelude::*;
//!
//! let mut manager = RecordingManager::new(RecordingConfig::for_testing())?;
//! let mut producer = manager.producer();
//!
//! let mut project = Tracklist::new();
//! let mut undo = UndoStack::new();
//! let track = project.add_audio_track("Vox");
//!
//! // audio callback, once per cycle
//! let input = [0.25f32; 256];
//! let cycle = TrackCycleInput {
//!     track,
//!     armed: true,
//!     content: TrackContent::Audio(StereoInput::mono(&input)),
//!     automation: &[],
//! };
//! producer.handle_recording(&cycle, CycleTime::new(0, 0, 256), &TransportState::recording());
//!
//! // consumer thread, or a `RecordingWorker` with the `worker` feature
//! manager.process_events(&mut project, &mut undo);
//! assert_eq!(project.region_count(), 1);
//! # Ok::<(), takeline::Error>(())
//! ```

/// Re-export of takeline-core for direct access
pub use takeline_core as core;

/// Re-export of takeline-recording for direct access
pub use takeline_recording as recording;

mod error;
pub use error::{Error, Result};

// Lock-free primitives
pub use takeline_core::{AtomicCounter, AtomicFlag, MpmcQueue, ObjectPool, PoolHandle};

// Recording pipeline
pub use takeline_recording::{
    AutomationInput, AutomationPoint, AutomationRecordMode, CycleTime, DrainReport, EntityState,
    MidiEvent, Note, ProjectModel, PunchRange, RecordAction, RecordOutcome, RecordingConfig,
    RecordingConfigBuilder, RecordingEvent, RecordingEventKind, RecordingManager,
    RecordingMetrics, RecordingMetricsSnapshot, RecordingMode, RecordingProducer, Region,
    RegionId, RegionKind, SelectionSnapshot, StereoInput, TeardownHandle, Track, TrackContent,
    TrackCycleInput, TrackId, TrackKind, Tracklist, TransportState, UndoSink, UndoStack,
};

#[cfg(feature = "worker")]
pub use takeline_recording::RecordingWorker;

/// Convenience prelude for common imports
pub mod prelude {
    // Manager and its audio-thread handle
    pub use crate::{RecordingConfig, RecordingManager, RecordingMode, RecordingProducer};

    // Per-cycle input
    pub use crate::{
        AutomationInput, CycleTime, MidiEvent, RecordingEventKind, StereoInput, TrackContent,
        TrackCycleInput, TransportState,
    };

    // Project and undo
    pub use crate::{ProjectModel, TrackId, Tracklist, UndoSink, UndoStack};

    #[cfg(feature = "worker")]
    pub use crate::RecordingWorker;
}
