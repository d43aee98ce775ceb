//! Consumer side of the recording pipeline.
//!
//! The [`RecordingManager`] drains recording events pushed by the audio
//! thread and turns them into regions, notes, audio and automation points in
//! a [`ProjectModel`]. When the last recording entity stops, the pass is
//! wrapped into a single [`RecordAction`] and handed to the [`UndoSink`].
//!
//! Each track and automation lane moves through
//! `Idle -> Recording -> (Paused <-> Recording) -> Idle`:
//!
//! - Start opens a region (tracks) or arms the lane (automation).
//! - Data on an idle entity starts it implicitly; data on a paused entity
//!   resumes it according to the [`RecordingMode`](crate::RecordingMode).
//! - Data must continue exactly where the previous event ended. A gap is
//!   logged once per entity, counted, discarded, and pauses the entity so
//!   the next event resumes cleanly.
//! - Stop on an idle entity does nothing.

mod automation;
mod state;
mod track;

pub use state::EntityState;

use crate::config::RecordingConfig;
use crate::event::{RecordingEvent, RecordingEventKind};
use crate::metrics::RecordingMetrics;
use crate::model::{ProjectModel, RegionId, SelectionSnapshot, TrackId, TrackKind};
use crate::producer::RecordingProducer;
use crate::shared::{RecordingShared, TeardownHandle};
use crate::undo::{RecordAction, UndoSink};
use crate::{Error, Result};
use state::{LaneKey, LaneRecording, TrackRecording};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of one [`RecordingManager::process_events`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Events applied to the project model.
    pub processed: usize,
    /// Events received but not applied (gaps, unknown tracks, model errors).
    pub discarded: usize,
    /// Events returned to the pool unhandled because teardown started.
    pub released: usize,
}

/// Region ids created during the current pass, bounded.
#[derive(Debug)]
struct RecordedRegions {
    ids: Vec<RegionId>,
    capacity: usize,
    overflow_logged: bool,
}

impl RecordedRegions {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            capacity,
            overflow_logged: false,
        }
    }

    fn push(&mut self, id: RegionId) {
        if self.ids.len() < self.capacity {
            self.ids.push(id);
        } else if !self.overflow_logged {
            self.overflow_logged = true;
            warn!(
                "More than {} regions recorded in one pass; further regions will not be part of the undo action",
                self.capacity
            );
        }
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.overflow_logged = false;
    }
}

/// Consumer-side recording state machine.
///
/// Owns the event pool and queue (shared with its producers). Create one per
/// engine, hand [`producer`](Self::producer) to the audio callback, and call
/// [`process_events`](Self::process_events) periodically from a non-RT thread
/// (or let a `RecordingWorker` do it).
pub struct RecordingManager {
    config: RecordingConfig,
    shared: Arc<RecordingShared>,
    tracks: HashMap<TrackId, TrackRecording>,
    lanes: HashMap<LaneKey, LaneRecording>,
    active: usize,
    recorded: RecordedRegions,
    selection_before: Option<SelectionSnapshot>,
    drops_at_pass_start: u64,
}

impl RecordingManager {
    /// Preallocate the pool and queue. Fails on an invalid config, in which
    /// case recording cannot be armed.
    pub fn new(config: RecordingConfig) -> Result<Self> {
        config.validate()?;
        let shared = Arc::new(RecordingShared::new(&config)?);
        debug!(
            "Recording manager ready: {} events of {} frames, queue {}",
            shared.pool.capacity(),
            config.max_block_length,
            shared.queue.capacity()
        );

        Ok(Self {
            recorded: RecordedRegions::with_capacity(config.recorded_ids_capacity),
            config,
            shared,
            tracks: HashMap::new(),
            lanes: HashMap::new(),
            active: 0,
            selection_before: None,
            drops_at_pass_start: 0,
        })
    }

    /// New audio-thread producer sharing this manager's queue and pool.
    pub fn producer(&self) -> RecordingProducer {
        RecordingProducer::new(
            Arc::clone(&self.shared),
            self.config.max_tracks,
            self.config.max_automation_lanes,
        )
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        TeardownHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn metrics(&self) -> Arc<RecordingMetrics> {
        Arc::clone(&self.shared.metrics)
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }

    /// Tracks and automation lanes currently recording or paused.
    pub fn active_recording_count(&self) -> usize {
        self.active
    }

    pub fn is_recording(&self) -> bool {
        self.active > 0
    }

    /// Regions created so far in the current pass.
    pub fn recorded_regions(&self) -> &[RegionId] {
        &self.recorded.ids
    }

    pub fn track_state(&self, track: TrackId) -> EntityState {
        self.tracks
            .get(&track)
            .map_or(EntityState::Idle, |rec| rec.state)
    }

    pub fn automation_state(&self, track: TrackId, lane: u32) -> EntityState {
        self.lanes
            .get(&(track, lane))
            .map_or(EntityState::Idle, |rec| rec.state)
    }

    /// Events waiting in the queue.
    pub fn pending_events(&self) -> usize {
        self.shared.queue.len()
    }

    /// Pool slots not currently holding an event.
    pub fn free_events(&self) -> usize {
        self.shared.pool.free_count()
    }

    /// Drain every queued event and apply it to `project`.
    ///
    /// Returns immediately if another drain is in flight. After teardown has
    /// started, events are released back to the pool without being handled.
    pub fn process_events(
        &mut self,
        project: &mut dyn ProjectModel,
        undo: &mut dyn UndoSink,
    ) -> DrainReport {
        let shared = Arc::clone(&self.shared);
        let Some(_guard) = shared.gate.enter() else {
            warn!("Recording events are already being processed");
            return DrainReport::default();
        };

        let freeing = shared.freeing.get();
        let mut report = DrainReport::default();

        while let Some(handle) = shared.queue.try_pop() {
            if freeing {
                report.released += 1;
            } else if let Some(event) = shared.pool.get(&handle) {
                match self.handle_event(event, project, undo) {
                    Ok(()) => {
                        shared.metrics.processed.increment();
                        report.processed += 1;
                    }
                    Err(err) => {
                        self.record_discard(&err, event);
                        report.discarded += 1;
                    }
                }
            }
            if let Err(err) = shared.pool.release(handle) {
                warn!("Failed to return recording event to the pool: {}", err);
            }
        }

        if report.released > 0 {
            shared
                .metrics
                .released_on_teardown
                .add(report.released as u64);
        }
        report
    }

    /// Stop accepting events and return everything still queued to the pool.
    ///
    /// The audio thread must no longer push once this returns; the pool and
    /// queue are freed when the manager is dropped. Returns the number of
    /// events released.
    pub fn teardown(&mut self) -> usize {
        let shared = Arc::clone(&self.shared);
        shared.freeing.set(true);
        shared.gate.wait_idle();

        let mut released = 0usize;
        while let Some(handle) = shared.queue.try_pop() {
            match shared.pool.release(handle) {
                Ok(()) => released += 1,
                Err(err) => warn!("Failed to return recording event to the pool: {}", err),
            }
        }
        shared.metrics.released_on_teardown.add(released as u64);

        if self.active > 0 {
            warn!(
                "Recording torn down with {} entities still recording; the pass is abandoned",
                self.active
            );
            self.tracks.clear();
            self.lanes.clear();
            self.active = 0;
            self.recorded.clear();
            self.selection_before = None;
        }
        info!("Recording torn down, released {} pending events", released);
        released
    }

    fn handle_event(
        &mut self,
        event: &RecordingEvent,
        project: &mut dyn ProjectModel,
        undo: &mut dyn UndoSink,
    ) -> Result<()> {
        let track = event.track();
        let kind = project
            .track_kind(track)
            .ok_or(Error::UnknownTrack(track))?;
        let time = event.time();

        match event.kind() {
            RecordingEventKind::StartTrackRecording => self.start_track(project, track, kind, time),
            RecordingEventKind::Midi(midi) => {
                require_kind(track, kind, TrackKind::Midi, "midi")?;
                self.record_midi(project, track, time, midi)
            }
            RecordingEventKind::Audio => {
                require_kind(track, kind, TrackKind::Audio, "audio")?;
                let (left, right) = event
                    .audio()
                    .ok_or_else(|| Error::MalformedEvent("audio event without samples".into()))?;
                self.record_audio(project, track, time, left, right)
            }
            RecordingEventKind::PauseTrackRecording => self.pause_track(project, track, time),
            RecordingEventKind::StopTrackRecording => self.stop_track(project, undo, track),
            RecordingEventKind::StartAutomationRecording { lane } => {
                self.start_lane(project, track, lane, time)
            }
            RecordingEventKind::Automation {
                lane,
                value,
                touching,
            } => self.record_automation(project, track, lane, time, value, touching),
            RecordingEventKind::PauseAutomationRecording { lane } => {
                self.pause_lane(track, lane);
                Ok(())
            }
            RecordingEventKind::StopAutomationRecording { lane } => {
                self.stop_lane(project, undo, track, lane);
                Ok(())
            }
        }
    }

    fn record_discard(&self, err: &Error, event: &RecordingEvent) {
        let metrics = &self.shared.metrics;
        match err {
            // logged once per entity by the handler
            Error::Gap { .. } => metrics.gaps.increment(),
            Error::UnknownTrack(_) => {
                metrics.unresolved.increment();
                warn!("Discarding {} event: {}", event.kind().name(), err);
            }
            Error::TrackKindMismatch { .. } | Error::MalformedEvent(_) => {
                metrics.malformed.increment();
                warn!("Discarding {} event: {}", event.kind().name(), err);
            }
            _ => {
                metrics.failed.increment();
                warn!(
                    "Failed to apply {} event for {}: {}",
                    event.kind().name(),
                    event.track(),
                    err
                );
            }
        }
        #[cfg(debug_assertions)]
        if let Some(origin) = event.origin() {
            debug!("Discarded event was pushed at {}", origin);
        }
    }

    /// An entity (track or lane) enters the pass.
    fn begin_entity(&mut self, project: &dyn ProjectModel) {
        if self.active == 0 {
            self.selection_before = Some(project.selection());
            self.drops_at_pass_start = self.shared.metrics.dropped();
            self.recorded.clear();
            info!("----- Recording pass started");
        }
        self.active += 1;
    }

    /// An entity left the pass. Completes the pass when it was the last one.
    fn finish_entity(&mut self, project: &mut dyn ProjectModel, undo: &mut dyn UndoSink) {
        if self.active == 0 {
            warn!("Recording stop without a matching start");
            return;
        }
        self.active -= 1;
        if self.active == 0 {
            self.complete_pass(project, undo);
        }
    }

    fn complete_pass(&mut self, project: &mut dyn ProjectModel, undo: &mut dyn UndoSink) {
        let before = self.selection_before.take().unwrap_or_default();
        let regions = self.recorded.ids.clone();
        self.recorded.clear();

        let dropped = self
            .shared
            .metrics
            .dropped()
            .saturating_sub(self.drops_at_pass_start);
        if dropped > 0 {
            warn!(
                "{} recording events were dropped during this pass; the recording may have gaps",
                dropped
            );
        }

        if regions.is_empty() {
            info!("----- Recording pass finished without new regions");
            return;
        }

        project.select_regions(&regions);
        let after = project.selection();
        let count = regions.len();
        match undo.push_record_action(RecordAction {
            regions,
            before,
            after,
        }) {
            Ok(()) => info!("----- Recording pass finished with {} regions", count),
            Err(err) => error!("Failed to record undo action for recording pass: {}", err),
        }
    }
}

fn require_kind(
    track: TrackId,
    actual: TrackKind,
    expected: TrackKind,
    event: &'static str,
) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(Error::TrackKindMismatch { track, event })
    }
}

/// `"<track name> - lane <n> - recording"`, lanes counted from 1.
pub(crate) fn recording_clip_name(track_name: &str, lane: usize) -> String {
    format!("{} - lane {} - recording", track_name, lane + 1)
}

impl Drop for RecordingManager {
    fn drop(&mut self) {
        if !self.shared.freeing.get() {
            self.teardown();
        }
    }
}

impl std::fmt::Debug for RecordingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingManager")
            .field("mode", &self.config.mode)
            .field("active", &self.active)
            .field("recorded", &self.recorded.ids.len())
            .field("pending", &self.pending_events())
            .finish()
    }
}
