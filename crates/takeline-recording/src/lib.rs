//! Real-time recording pipeline.
//!
//! The audio thread describes what it captured each cycle as
//! [`RecordingEvent`]s, taken from a preallocated pool and handed over through
//! a lock-free queue by a [`RecordingProducer`]. A [`RecordingManager`] on a
//! non-RT thread drains the queue and turns the events into regions, notes,
//! audio and automation points in a [`ProjectModel`], producing one
//! [`RecordAction`] per recording pass.
//!
//! # Example
//!
//! ```
//! use takeline_recording::{
//!     CycleTime, RecordingConfig, RecordingEventKind, RecordingManager, Tracklist, UndoStack,
//! };
//!
//! let mut manager = RecordingManager::new(RecordingConfig::for_testing()).unwrap();
//! let producer = manager.producer();
//! let mut project = Tracklist::new();
//! let mut undo = UndoStack::new();
//! let track = project.add_midi_track("Keys");
//!
//! // audio thread
//! producer.push(track, CycleTime::new(0, 0, 256), RecordingEventKind::Midi(None));
//! producer.push(track, CycleTime::at(256, 0), RecordingEventKind::StopTrackRecording);
//!
//! // consumer thread
//! manager.process_events(&mut project, &mut undo);
//! assert_eq!(project.region_count(), 1);
//! assert_eq!(undo.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod manager;
pub mod metrics;
pub mod model;
pub mod producer;
mod shared;
pub mod tracklist;
pub mod undo;
#[cfg(feature = "worker")]
pub mod worker;

pub use config::{RecordingConfig, RecordingConfigBuilder, RecordingMode};
pub use error::{Error, Result};
pub use event::{CycleTime, MidiEvent, RecordingEvent, RecordingEventKind, StereoInput};
pub use manager::{DrainReport, EntityState, RecordingManager};
pub use metrics::{RecordingMetrics, RecordingMetricsSnapshot};
pub use model::{
    AutomationPoint, AutomationRecordMode, NewRegion, Note, NoteId, ProjectModel, RegionId,
    RegionKind, RegionPlacement, SelectionSnapshot, TrackId, TrackKind,
};
pub use producer::{
    AutomationInput, PunchRange, RecordOutcome, RecordingProducer, TrackContent,
    TrackCycleInput, TransportState,
};
pub use shared::TeardownHandle;
pub use tracklist::{Region, RegionContent, Track, Tracklist};
pub use undo::{RecordAction, UndoSink, UndoStack};
#[cfg(feature = "worker")]
pub use worker::RecordingWorker;

pub use midi_msg::{Channel, ChannelVoiceMsg};
