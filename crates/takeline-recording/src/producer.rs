//! Audio-thread side of the recording pipeline.
//!
//! A [`RecordingProducer`] turns one track's processor output for one cycle
//! into recording events. Every method here is RT-safe: no allocation, no
//! locks, no blocking. Failures are counted in [`RecordingMetrics`] and the
//! event is dropped.

use crate::event::{CycleTime, MidiEvent, RecordingEventKind, StereoInput};
use crate::metrics::RecordingMetrics;
use crate::model::TrackId;
use crate::shared::RecordingShared;
use std::panic::Location;
use std::sync::Arc;

/// Punch range in absolute frames, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunchRange {
    pub start: u64,
    pub end: u64,
}

/// Transport state sampled at the start of the cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportState {
    /// Global record enable.
    pub record_enabled: bool,
    pub rolling: bool,
    /// `None` records everywhere.
    pub punch: Option<PunchRange>,
}

impl TransportState {
    pub fn recording() -> Self {
        Self {
            record_enabled: true,
            rolling: true,
            punch: None,
        }
    }

    pub fn stopped() -> Self {
        Self::default()
    }

    pub fn with_punch(mut self, start: u64, end: u64) -> Self {
        self.punch = Some(PunchRange { start, end });
        self
    }

    #[inline]
    pub fn in_punch_range(&self, frame: u64) -> bool {
        self.punch
            .map_or(true, |punch| frame >= punch.start && frame < punch.end)
    }
}

/// What the track processor produced this cycle.
#[derive(Debug, Clone, Copy)]
pub enum TrackContent<'a> {
    /// MIDI events with cycle-relative offsets.
    Midi(&'a [MidiEvent]),
    Audio(StereoInput<'a>),
    /// Track records automation only.
    None,
}

/// An automation lane's state for this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomationInput {
    pub lane: u32,
    /// The lane is in a record mode (latch, or touch while armed).
    pub recording: bool,
    pub value: f32,
    pub touching: bool,
}

/// One track's processor output for one cycle.
#[derive(Debug, Clone, Copy)]
pub struct TrackCycleInput<'a> {
    pub track: TrackId,
    pub armed: bool,
    pub content: TrackContent<'a>,
    pub automation: &'a [AutomationInput],
}

/// Result of one [`RecordingProducer::handle_recording`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    pub pushed: u32,
    pub dropped: u32,
}

impl RecordOutcome {
    #[inline]
    fn record(&mut self, pushed: bool) {
        if pushed {
            self.pushed += 1;
        } else {
            self.dropped += 1;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TrackFlags {
    track: TrackId,
    /// Start sent and no stop sent since.
    recording: bool,
    paused: bool,
    /// Pause that could not be queued; sent before the next data event.
    pending_pause: Option<CycleTime>,
}

#[derive(Debug, Clone, Copy)]
struct LaneFlags {
    track: TrackId,
    lane: u32,
    recording: bool,
    paused: bool,
    pending_pause: Option<CycleTime>,
}

/// Audio-thread handle for pushing recording events.
///
/// Clones share the queue and pool but keep their own per-track flags, so
/// each audio thread should own one.
pub struct RecordingProducer {
    shared: Arc<RecordingShared>,
    tracks: Vec<TrackFlags>,
    max_tracks: usize,
    lanes: Vec<LaneFlags>,
    max_lanes: usize,
}

impl RecordingProducer {
    pub(crate) fn new(shared: Arc<RecordingShared>, max_tracks: usize, max_lanes: usize) -> Self {
        Self {
            shared,
            tracks: Vec::with_capacity(max_tracks),
            max_tracks,
            lanes: Vec::with_capacity(max_lanes),
            max_lanes,
        }
    }

    /// Push a non-audio event.
    ///
    /// Returns `false` if the event was dropped (pool exhausted, queue full,
    /// invalid arguments, or shutdown in progress).
    #[track_caller]
    #[inline]
    pub fn push(&self, track: TrackId, time: CycleTime, kind: RecordingEventKind) -> bool {
        self.push_event(track, time, kind, None, Location::caller())
    }

    /// Push an audio event, copying `[local_offset, local_offset + frame_count)`
    /// out of `input`.
    #[track_caller]
    #[inline]
    pub fn push_audio(&self, track: TrackId, time: CycleTime, input: StereoInput<'_>) -> bool {
        self.push_event(
            track,
            time,
            RecordingEventKind::Audio,
            Some(input),
            Location::caller(),
        )
    }

    fn push_event(
        &self,
        track: TrackId,
        time: CycleTime,
        kind: RecordingEventKind,
        audio: Option<StereoInput<'_>>,
        origin: &'static Location<'static>,
    ) -> bool {
        let shared = &*self.shared;
        let metrics = &shared.metrics;

        if shared.freeing.get() {
            metrics.rejected.increment();
            return false;
        }

        let Some(mut handle) = shared.pool.acquire() else {
            metrics.pool_exhausted.increment();
            return false;
        };

        let populated = shared
            .pool
            .get_mut(&mut handle)
            .is_some_and(|event| event.populate(track, time, kind, audio, origin));
        if !populated {
            metrics.rejected.increment();
            let _ = shared.pool.release(handle);
            return false;
        }

        match shared.queue.try_push(handle) {
            Ok(()) => {
                metrics.pushed.increment();
                true
            }
            Err(handle) => {
                metrics.queue_full.increment();
                let _ = shared.pool.release(handle);
                false
            }
        }
    }

    /// Decide what to record for one track this cycle and push it.
    ///
    /// Sends Start on the first recordable cycle, data while recording,
    /// Pause on zero-length cycles or outside the punch range, and Stop once
    /// the track is disarmed or the transport stops. Automation lanes are
    /// handled independently of the track's armed state.
    #[track_caller]
    pub fn handle_recording(
        &mut self,
        input: &TrackCycleInput<'_>,
        time: CycleTime,
        transport: &TransportState,
    ) -> RecordOutcome {
        let mut outcome = RecordOutcome::default();
        let track = input.track;
        let at = CycleTime::at(time.global_start_frame, time.local_offset);

        let Some(slot) = self.track_slot(track) else {
            self.shared.metrics.rejected.increment();
            outcome.dropped += 1;
            return outcome;
        };
        let mut flags = self.tracks[slot];

        // a control event that could not be queued is sent again on a later
        // cycle, so the consumer never misses a state change
        let capturing = transport.record_enabled && transport.rolling && input.armed;
        if !capturing {
            if flags.recording {
                let stop = self.push(track, at, RecordingEventKind::StopTrackRecording);
                outcome.record(stop);
                if stop {
                    flags.recording = false;
                    flags.paused = false;
                    flags.pending_pause = None;
                }
            }
        } else if time.frame_count == 0 || !transport.in_punch_range(time.global_start_frame) {
            if flags.recording && !flags.paused {
                let pause = self.push(track, at, RecordingEventKind::PauseTrackRecording);
                outcome.record(pause);
                flags.paused = true;
                flags.pending_pause = (!pause).then_some(at);
            }
        } else {
            if !flags.recording {
                let start = self.push(track, time, RecordingEventKind::StartTrackRecording);
                outcome.record(start);
                flags.recording = start;
            }
            if let Some(pause_at) = flags.pending_pause {
                let pause = self.push(track, pause_at, RecordingEventKind::PauseTrackRecording);
                outcome.record(pause);
                if pause {
                    flags.pending_pause = None;
                }
            }
            flags.paused = false;

            match input.content {
                TrackContent::Midi(events) => {
                    let mut any = false;
                    for event in events.iter().filter(|e| time.contains_offset(e.frame_offset)) {
                        any = true;
                        let midi = RecordingEventKind::Midi(Some(*event));
                        outcome.record(self.push(track, time, midi));
                    }
                    if !any {
                        outcome.record(self.push(track, time, RecordingEventKind::Midi(None)));
                    }
                }
                TrackContent::Audio(stereo) => {
                    outcome.record(self.push_audio(track, time, stereo));
                }
                TrackContent::None => {}
            }
        }
        self.tracks[slot] = flags;

        for automation in input.automation {
            self.handle_automation(track, automation, time, transport, &mut outcome);
        }
        outcome
    }

    #[track_caller]
    fn handle_automation(
        &mut self,
        track: TrackId,
        input: &AutomationInput,
        time: CycleTime,
        transport: &TransportState,
        outcome: &mut RecordOutcome,
    ) {
        let lane = input.lane;
        let at = CycleTime::at(time.global_start_frame, time.local_offset);

        let Some(slot) = self.lane_slot(track, lane) else {
            self.shared.metrics.rejected.increment();
            outcome.dropped += 1;
            return;
        };
        let mut flags = self.lanes[slot];

        if !(transport.rolling && input.recording) {
            if flags.recording {
                let stop =
                    self.push(track, at, RecordingEventKind::StopAutomationRecording { lane });
                outcome.record(stop);
                if stop {
                    flags.recording = false;
                    flags.paused = false;
                    flags.pending_pause = None;
                }
            }
        } else if time.frame_count == 0 {
            if flags.recording && !flags.paused {
                let pause =
                    self.push(track, at, RecordingEventKind::PauseAutomationRecording { lane });
                outcome.record(pause);
                flags.paused = true;
                flags.pending_pause = (!pause).then_some(at);
            }
        } else {
            if !flags.recording {
                let start =
                    self.push(track, time, RecordingEventKind::StartAutomationRecording { lane });
                outcome.record(start);
                flags.recording = start;
            }
            if let Some(pause_at) = flags.pending_pause {
                let pause = self.push(
                    track,
                    pause_at,
                    RecordingEventKind::PauseAutomationRecording { lane },
                );
                outcome.record(pause);
                if pause {
                    flags.pending_pause = None;
                }
            }
            flags.paused = false;
            let value = RecordingEventKind::Automation {
                lane,
                value: input.value,
                touching: input.touching,
            };
            outcome.record(self.push(track, time, value));
        }
        self.lanes[slot] = flags;
    }

    fn track_slot(&mut self, track: TrackId) -> Option<usize> {
        if let Some(slot) = self.tracks.iter().position(|f| f.track == track) {
            return Some(slot);
        }
        if self.tracks.len() >= self.max_tracks {
            return None;
        }
        self.tracks.push(TrackFlags {
            track,
            recording: false,
            paused: false,
            pending_pause: None,
        });
        Some(self.tracks.len() - 1)
    }

    fn lane_slot(&mut self, track: TrackId, lane: u32) -> Option<usize> {
        if let Some(slot) = self
            .lanes
            .iter()
            .position(|f| f.track == track && f.lane == lane)
        {
            return Some(slot);
        }
        if self.lanes.len() >= self.max_lanes {
            return None;
        }
        self.lanes.push(LaneFlags {
            track,
            lane,
            recording: false,
            paused: false,
            pending_pause: None,
        });
        Some(self.lanes.len() - 1)
    }

    /// Whether this producer has sent Start (and no Stop yet) for `track`.
    pub fn is_recording(&self, track: TrackId) -> bool {
        self.tracks
            .iter()
            .any(|f| f.track == track && f.recording)
    }

    /// `false` once teardown has started.
    pub fn is_accepting(&self) -> bool {
        !self.shared.freeing.get()
    }

    pub fn metrics(&self) -> Arc<RecordingMetrics> {
        Arc::clone(&self.shared.metrics)
    }
}

impl Clone for RecordingProducer {
    /// New producer on the same queue with empty per-track flags.
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.shared), self.max_tracks, self.max_lanes)
    }
}

impl std::fmt::Debug for RecordingProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingProducer")
            .field("tracks", &self.tracks.len())
            .field("lanes", &self.lanes.len())
            .finish()
    }
}
