//! Test helpers and fixtures for takeline integration tests
//!
//! Tests drive the pipeline the way an engine does: a producer standing in
//! for the audio callback, an in-memory [`Tracklist`] as the project and an
//! [`UndoStack`] collecting one action per recording pass.

#![allow(dead_code)]

use std::sync::Once;
use std::time::{Duration, Instant};
use takeline::prelude::*;

/// Cycle length used by most scenarios.
pub const TEST_BLOCK: u32 = 128;

static TRACING: Once = Once::new();

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Manager with the small test capacities and the given mode.
pub fn test_manager(mode: RecordingMode) -> RecordingManager {
    init_tracing();
    let config = RecordingConfig::builder()
        .max_block_length(1024)
        .event_capacity(400)
        .max_tracks(16)
        .drain_interval(Duration::from_millis(2))
        .mode(mode)
        .build()
        .expect("Failed to build test config");
    RecordingManager::new(config).expect("Failed to create test manager")
}

/// Manager, producer, project and undo history for single-threaded tests.
pub struct Pipeline {
    pub manager: RecordingManager,
    pub producer: RecordingProducer,
    pub project: Tracklist,
    pub undo: UndoStack,
}

impl Pipeline {
    pub fn new(mode: RecordingMode) -> Self {
        Self::from_manager(test_manager(mode))
    }

    pub fn with_config(config: RecordingConfig) -> Self {
        init_tracing();
        Self::from_manager(RecordingManager::new(config).expect("Failed to create test manager"))
    }

    fn from_manager(manager: RecordingManager) -> Self {
        let producer = manager.producer();
        Self {
            manager,
            producer,
            project: Tracklist::new(),
            undo: UndoStack::new(),
        }
    }

    /// Run `handle_recording` for one cycle starting at `start`.
    pub fn cycle(
        &mut self,
        input: &TrackCycleInput<'_>,
        start: u64,
        frames: u32,
        transport: &TransportState,
    ) -> takeline::RecordOutcome {
        self.producer
            .handle_recording(input, CycleTime::new(start, 0, frames), transport)
    }

    pub fn drain(&mut self) -> takeline::DrainReport {
        self.manager.process_events(&mut self.project, &mut self.undo)
    }
}

/// Audio cycle input for an armed track.
pub fn audio_input(track: TrackId, samples: &[f32]) -> TrackCycleInput<'_> {
    TrackCycleInput {
        track,
        armed: true,
        content: TrackContent::Audio(StereoInput::mono(samples)),
        automation: &[],
    }
}

/// MIDI cycle input for an armed track.
pub fn midi_input(track: TrackId, events: &[MidiEvent]) -> TrackCycleInput<'_> {
    TrackCycleInput {
        track,
        armed: true,
        content: TrackContent::Midi(events),
        automation: &[],
    }
}

/// Generate an integer staircase signal [offset, offset + 1, ...] as f32.
///
/// Each sample equals its absolute frame, so recorded audio can be verified
/// sample by sample.
pub fn staircase(offset: u64, num_samples: usize) -> Vec<f32> {
    (0..num_samples).map(|i| (offset + i as u64) as f32).collect()
}

/// Poll `condition` every millisecond until it holds or `max_wait_ms` passes.
pub fn wait_for(max_wait_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_wait_ms);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
