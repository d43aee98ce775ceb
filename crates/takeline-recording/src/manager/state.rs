//! Per-entity recording state kept by the manager.

use crate::model::{AutomationRecordMode, NoteId, RegionId, TrackId};
use smallvec::SmallVec;

/// Lifecycle of a track or automation lane within a recording pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    Idle,
    Recording,
    Paused,
}

/// Result of checking an event against the frame cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Continuity {
    /// First event of a new cycle.
    NewCycle,
    /// Another MIDI event in the cycle already seen.
    SameCycle,
    /// Neither; `expected` is the frame the next event had to start at.
    Gap { expected: u64 },
}

/// Tracks where the next event of an entity must start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameCursor {
    cycle_start: u64,
    next: u64,
}

impl FrameCursor {
    pub(crate) fn at(frame: u64) -> Self {
        Self {
            cycle_start: frame,
            next: frame,
        }
    }

    pub(crate) fn next(&self) -> u64 {
        self.next
    }

    pub(crate) fn check(&self, start: u64, end: u64, allow_same_cycle: bool) -> Continuity {
        if start == self.next {
            Continuity::NewCycle
        } else if allow_same_cycle && start == self.cycle_start && end == self.next {
            Continuity::SameCycle
        } else {
            Continuity::Gap {
                expected: self.next,
            }
        }
    }

    pub(crate) fn advance(&mut self, start: u64, end: u64) {
        self.cycle_start = start;
        self.next = end;
    }
}

/// Note-on seen without its note-off yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnendedNote {
    pub(crate) id: NoteId,
    pub(crate) pitch: u8,
    pub(crate) channel: u8,
}

#[derive(Debug)]
pub(crate) struct TrackRecording {
    pub(crate) state: EntityState,
    pub(crate) region: RegionId,
    pub(crate) lane: usize,
    pub(crate) cursor: FrameCursor,
    pub(crate) unended: SmallVec<[UnendedNote; 16]>,
    /// A gap was already logged for this track in this pass.
    pub(crate) gap_logged: bool,
}

impl TrackRecording {
    pub(crate) fn new(region: RegionId, lane: usize, start_frame: u64) -> Self {
        Self {
            state: EntityState::Recording,
            region,
            lane,
            cursor: FrameCursor::at(start_frame),
            unended: SmallVec::new(),
            gap_logged: false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct LaneRecording {
    pub(crate) state: EntityState,
    pub(crate) mode: AutomationRecordMode,
    /// Region written by the last point, if it is still known.
    pub(crate) region: Option<RegionId>,
    pub(crate) last_value: Option<f32>,
    /// Absolute position and value of the last written point.
    pub(crate) last_point: Option<(u64, f32)>,
    pub(crate) cursor: FrameCursor,
    pub(crate) gap_logged: bool,
}

impl LaneRecording {
    pub(crate) fn new(mode: AutomationRecordMode, start_frame: u64) -> Self {
        Self {
            state: EntityState::Recording,
            mode,
            region: None,
            last_value: None,
            last_point: None,
            cursor: FrameCursor::at(start_frame),
            gap_logged: false,
        }
    }
}

/// Key for automation lane state.
pub(crate) type LaneKey = (TrackId, u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_contiguity() {
        let mut cursor = FrameCursor::at(0);
        assert_eq!(cursor.check(0, 128, false), Continuity::NewCycle);
        cursor.advance(0, 128);

        assert_eq!(cursor.check(128, 256, false), Continuity::NewCycle);
        assert_eq!(cursor.check(0, 128, true), Continuity::SameCycle);
        assert_eq!(
            cursor.check(0, 128, false),
            Continuity::Gap { expected: 128 }
        );
        assert_eq!(
            cursor.check(512, 640, true),
            Continuity::Gap { expected: 128 }
        );
        assert_eq!(cursor.next(), 128);
    }
}
