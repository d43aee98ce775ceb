//! Project model interface consumed by the recording manager.
//!
//! The manager never owns regions. It resolves tracks and mutates regions
//! only through [`ProjectModel`], on the consumer thread.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque track identifier, resolved through the project model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u64);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Midi,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    Midi,
    Audio,
    Automation,
}

/// How an automation lane in record mode writes points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AutomationRecordMode {
    /// Keep writing (and holding the last value) until recording stops
    #[default]
    Latch,
    /// Write only while the control is touched
    Touch,
}

/// Where a region lives on its track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionPlacement {
    /// Lane index; the lane is created if it does not exist yet.
    Lane(usize),
    /// Automation lane index.
    Automation(u32),
}

/// Request to create a region. Positions are absolute frames.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRegion {
    pub track: TrackId,
    pub placement: RegionPlacement,
    pub kind: RegionKind,
    pub start_frame: u64,
    pub end_frame: u64,
    pub name: Option<String>,
}

/// A MIDI note. Positions are frames relative to the region start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub start: u64,
    pub end: u64,
    pub pitch: u8,
    pub velocity: u8,
    pub channel: u8,
}

impl Note {
    pub fn length(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// Automation point, position relative to the region start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomationPoint {
    pub position: u64,
    pub value: f32,
}

/// Snapshot of the selected regions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    regions: BTreeSet<RegionId>,
}

impl SelectionSnapshot {
    pub fn new(regions: impl IntoIterator<Item = RegionId>) -> Self {
        Self {
            regions: regions.into_iter().collect(),
        }
    }

    pub fn contains(&self, region: RegionId) -> bool {
        self.regions.contains(&region)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.regions.iter().copied()
    }

    /// Regions selected in `self` but not in `earlier`.
    pub fn added_since(&self, earlier: &SelectionSnapshot) -> Vec<RegionId> {
        self.regions.difference(&earlier.regions).copied().collect()
    }

    /// Regions selected in `earlier` but not in `self`.
    pub fn removed_since(&self, earlier: &SelectionSnapshot) -> Vec<RegionId> {
        earlier.regions.difference(&self.regions).copied().collect()
    }
}

/// Track and region model the recording manager writes into.
///
/// All methods run on the consumer thread and may allocate or lock.
pub trait ProjectModel {
    fn track_kind(&self, track: TrackId) -> Option<TrackKind>;

    fn track_name(&self, track: TrackId) -> Option<&str>;

    /// Number of lanes on the track.
    fn lane_count(&self, track: TrackId) -> usize;

    /// Record mode of an automation lane, `None` if the lane does not exist.
    fn automation_mode(&self, track: TrackId, lane: u32) -> Option<AutomationRecordMode>;

    fn create_region(&mut self, region: NewRegion) -> Result<RegionId>;

    /// Absolute `(start, end)` frames of a region.
    fn region_bounds(&self, region: RegionId) -> Option<(u64, u64)>;

    /// Move the region end. The start is never changed by this call.
    fn set_region_end(&mut self, region: RegionId, end_frame: u64) -> Result<()>;

    /// Move the region start earlier, shifting its contents so they keep
    /// their absolute positions.
    fn move_region_start(&mut self, region: RegionId, start_frame: u64) -> Result<()>;

    fn set_region_muted(&mut self, region: RegionId, muted: bool) -> Result<()>;

    /// Append samples to an audio region's clip. Returns the new clip length.
    fn append_audio(&mut self, region: RegionId, left: &[f32], right: &[f32]) -> Result<u64>;

    fn add_note(&mut self, region: RegionId, note: Note) -> Result<NoteId>;

    fn note(&self, region: RegionId, note: NoteId) -> Option<Note>;

    fn set_note_end(&mut self, region: RegionId, note: NoteId, end: u64) -> Result<()>;

    /// Remove notes starting in `[start, end)` (region-relative). Returns the
    /// number removed.
    fn remove_notes_in(&mut self, region: RegionId, start: u64, end: u64) -> Result<usize>;

    /// Automation region on `lane` covering `frame` (inclusive of its end).
    fn automation_region_at(&self, track: TrackId, lane: u32, frame: u64) -> Option<RegionId>;

    fn add_automation_point(&mut self, region: RegionId, point: AutomationPoint) -> Result<()>;

    /// Remove points in `(after, until]` (region-relative). Returns the
    /// number removed.
    fn remove_automation_points(&mut self, region: RegionId, after: u64, until: u64)
        -> Result<usize>;

    fn selection(&self) -> SelectionSnapshot;

    fn select_regions(&mut self, regions: &[RegionId]);
}
