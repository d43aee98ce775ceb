//! In-memory [`ProjectModel`] implementation.

use crate::model::{
    AutomationPoint, AutomationRecordMode, NewRegion, Note, NoteId, ProjectModel, RegionId,
    RegionKind, RegionPlacement, SelectionSnapshot, TrackId, TrackKind,
};
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    name: String,
    kind: TrackKind,
    lanes: usize,
    automation: Vec<AutomationRecordMode>,
}

impl Track {
    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn lane_count(&self) -> usize {
        self.lanes
    }

    pub fn automation_lane_count(&self) -> usize {
        self.automation.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionContent {
    Midi(Vec<(NoteId, Note)>),
    Audio { left: Vec<f32>, right: Vec<f32> },
    Automation(Vec<AutomationPoint>),
}

#[derive(Debug, Clone)]
pub struct Region {
    id: RegionId,
    track: TrackId,
    placement: RegionPlacement,
    name: String,
    start: u64,
    end: u64,
    muted: bool,
    content: RegionContent,
}

impl Region {
    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn track(&self) -> TrackId {
        self.track
    }

    pub fn placement(&self) -> RegionPlacement {
        self.placement
    }

    /// Lane index for track lanes, `None` for automation regions.
    pub fn lane(&self) -> Option<usize> {
        match self.placement {
            RegionPlacement::Lane(lane) => Some(lane),
            RegionPlacement::Automation(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn length(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn kind(&self) -> RegionKind {
        match self.content {
            RegionContent::Midi(_) => RegionKind::Midi,
            RegionContent::Audio { .. } => RegionKind::Audio,
            RegionContent::Automation(_) => RegionKind::Automation,
        }
    }

    pub fn content(&self) -> &RegionContent {
        &self.content
    }

    /// Notes sorted by start position.
    pub fn notes(&self) -> Vec<Note> {
        match &self.content {
            RegionContent::Midi(notes) => {
                let mut notes: Vec<Note> = notes.iter().map(|(_, note)| *note).collect();
                notes.sort_by_key(|note| (note.start, note.pitch));
                notes
            }
            _ => Vec::new(),
        }
    }

    pub fn audio(&self) -> Option<(&[f32], &[f32])> {
        match &self.content {
            RegionContent::Audio { left, right } => Some((left, right)),
            _ => None,
        }
    }

    pub fn automation_points(&self) -> &[AutomationPoint] {
        match &self.content {
            RegionContent::Automation(points) => points,
            _ => &[],
        }
    }
}

/// Tracks and regions kept in memory.
#[derive(Debug, Default)]
pub struct Tracklist {
    tracks: Vec<Track>,
    regions: BTreeMap<RegionId, Region>,
    selection: BTreeSet<RegionId>,
    next_track: u64,
    next_region: u64,
    next_note: u64,
}

impl Tracklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_track(&mut self, name: impl Into<String>, kind: TrackKind) -> TrackId {
        self.next_track += 1;
        let id = TrackId(self.next_track);
        self.tracks.push(Track {
            id,
            name: name.into(),
            kind,
            lanes: 1,
            automation: Vec::new(),
        });
        id
    }

    pub fn add_midi_track(&mut self, name: impl Into<String>) -> TrackId {
        self.add_track(name, TrackKind::Midi)
    }

    pub fn add_audio_track(&mut self, name: impl Into<String>) -> TrackId {
        self.add_track(name, TrackKind::Audio)
    }

    /// Add an automation lane, returning its index.
    pub fn add_automation_lane(
        &mut self,
        track: TrackId,
        mode: AutomationRecordMode,
    ) -> Result<u32> {
        let track = self.track_mut(track)?;
        track.automation.push(mode);
        Ok((track.automation.len() - 1) as u32)
    }

    pub fn set_automation_mode(
        &mut self,
        track: TrackId,
        lane: u32,
        mode: AutomationRecordMode,
    ) -> Result<()> {
        let slot = self
            .track_mut(track)?
            .automation
            .get_mut(lane as usize)
            .ok_or_else(|| Error::Model(format!("{} has no automation lane {}", track, lane)))?;
        *slot = mode;
        Ok(())
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id == id)
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Regions on the track's lanes, ordered by lane then start.
    pub fn regions_on_track(&self, track: TrackId) -> Vec<&Region> {
        let mut regions: Vec<&Region> = self
            .regions
            .values()
            .filter(|r| r.track == track && r.lane().is_some())
            .collect();
        regions.sort_by_key(|r| (r.lane(), r.start));
        regions
    }

    /// Regions on one automation lane, ordered by start.
    pub fn automation_regions(&self, track: TrackId, lane: u32) -> Vec<&Region> {
        let mut regions: Vec<&Region> = self
            .regions
            .values()
            .filter(|r| r.track == track && r.placement == RegionPlacement::Automation(lane))
            .collect();
        regions.sort_by_key(|r| r.start);
        regions
    }

    fn track_mut(&mut self, id: TrackId) -> Result<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|track| track.id == id)
            .ok_or(Error::UnknownTrack(id))
    }

    fn region_mut(&mut self, id: RegionId) -> Result<&mut Region> {
        self.regions.get_mut(&id).ok_or(Error::UnknownRegion(id))
    }

    fn midi_notes_mut(&mut self, id: RegionId) -> Result<&mut Vec<(NoteId, Note)>> {
        match &mut self.region_mut(id)?.content {
            RegionContent::Midi(notes) => Ok(notes),
            _ => Err(Error::Model(format!("{} is not a MIDI region", id))),
        }
    }

    fn automation_points_mut(&mut self, id: RegionId) -> Result<&mut Vec<AutomationPoint>> {
        match &mut self.region_mut(id)?.content {
            RegionContent::Automation(points) => Ok(points),
            _ => Err(Error::Model(format!("{} is not an automation region", id))),
        }
    }
}

impl ProjectModel for Tracklist {
    fn track_kind(&self, track: TrackId) -> Option<TrackKind> {
        self.track(track).map(Track::kind)
    }

    fn track_name(&self, track: TrackId) -> Option<&str> {
        self.track(track).map(Track::name)
    }

    fn lane_count(&self, track: TrackId) -> usize {
        self.track(track).map_or(0, Track::lane_count)
    }

    fn automation_mode(&self, track: TrackId, lane: u32) -> Option<AutomationRecordMode> {
        self.track(track)?.automation.get(lane as usize).copied()
    }

    fn create_region(&mut self, region: NewRegion) -> Result<RegionId> {
        if region.end_frame < region.start_frame {
            return Err(Error::Model(format!(
                "region end {} before start {}",
                region.end_frame, region.start_frame
            )));
        }

        let track = self.track_mut(region.track)?;
        let compatible = matches!(
            (region.kind, track.kind, region.placement),
            (RegionKind::Midi, TrackKind::Midi, RegionPlacement::Lane(_))
                | (RegionKind::Audio, TrackKind::Audio, RegionPlacement::Lane(_))
                | (RegionKind::Automation, _, RegionPlacement::Automation(_))
        );
        if !compatible {
            return Err(Error::Model(format!(
                "cannot place a {:?} region on {:?} of {:?} track {}",
                region.kind, region.placement, track.kind, track.id
            )));
        }
        match region.placement {
            RegionPlacement::Lane(lane) => track.lanes = track.lanes.max(lane + 1),
            RegionPlacement::Automation(lane) if lane as usize >= track.automation.len() => {
                return Err(Error::Model(format!(
                    "{} has no automation lane {}",
                    track.id, lane
                )));
            }
            RegionPlacement::Automation(_) => {}
        }
        let name = region.name.unwrap_or_else(|| track.name.clone());

        self.next_region += 1;
        let id = RegionId(self.next_region);
        let content = match region.kind {
            RegionKind::Midi => RegionContent::Midi(Vec::new()),
            RegionKind::Audio => RegionContent::Audio {
                left: Vec::new(),
                right: Vec::new(),
            },
            RegionKind::Automation => RegionContent::Automation(Vec::new()),
        };
        self.regions.insert(
            id,
            Region {
                id,
                track: region.track,
                placement: region.placement,
                name,
                start: region.start_frame,
                end: region.end_frame,
                muted: false,
                content,
            },
        );
        Ok(id)
    }

    fn region_bounds(&self, region: RegionId) -> Option<(u64, u64)> {
        self.region(region).map(|r| (r.start, r.end))
    }

    fn set_region_end(&mut self, region: RegionId, end_frame: u64) -> Result<()> {
        let region = self.region_mut(region)?;
        if end_frame < region.start {
            return Err(Error::Model(format!(
                "region end {} before start {}",
                end_frame, region.start
            )));
        }
        region.end = end_frame;
        Ok(())
    }

    fn move_region_start(&mut self, region: RegionId, start_frame: u64) -> Result<()> {
        let region = self.region_mut(region)?;
        if start_frame > region.start {
            return Err(Error::Model(format!(
                "{} start can only move earlier ({} > {})",
                region.id, start_frame, region.start
            )));
        }
        let shift = region.start - start_frame;
        match &mut region.content {
            RegionContent::Midi(notes) => {
                for (_, note) in notes.iter_mut() {
                    note.start += shift;
                    note.end += shift;
                }
            }
            RegionContent::Automation(points) => {
                for point in points.iter_mut() {
                    point.position += shift;
                }
            }
            RegionContent::Audio { .. } if shift > 0 => {
                return Err(Error::Model(format!(
                    "cannot move the start of audio {}",
                    region.id
                )));
            }
            RegionContent::Audio { .. } => {}
        }
        region.start = start_frame;
        Ok(())
    }

    fn set_region_muted(&mut self, region: RegionId, muted: bool) -> Result<()> {
        self.region_mut(region)?.muted = muted;
        Ok(())
    }

    fn append_audio(&mut self, region: RegionId, left: &[f32], right: &[f32]) -> Result<u64> {
        match &mut self.region_mut(region)?.content {
            RegionContent::Audio { left: l, right: r } => {
                l.extend_from_slice(left);
                r.extend_from_slice(right);
                Ok(l.len() as u64)
            }
            _ => Err(Error::Model(format!("{} is not an audio region", region))),
        }
    }

    fn add_note(&mut self, region: RegionId, note: Note) -> Result<NoteId> {
        self.next_note += 1;
        let id = NoteId(self.next_note);
        self.midi_notes_mut(region)?.push((id, note));
        Ok(id)
    }

    fn note(&self, region: RegionId, note: NoteId) -> Option<Note> {
        match &self.region(region)?.content {
            RegionContent::Midi(notes) => notes
                .iter()
                .find(|(id, _)| *id == note)
                .map(|(_, note)| *note),
            _ => None,
        }
    }

    fn set_note_end(&mut self, region: RegionId, note: NoteId, end: u64) -> Result<()> {
        let entry = self
            .midi_notes_mut(region)?
            .iter_mut()
            .find(|(id, _)| *id == note)
            .ok_or_else(|| Error::Model(format!("{} has no note {:?}", region, note)))?;
        entry.1.end = end.max(entry.1.start);
        Ok(())
    }

    fn remove_notes_in(&mut self, region: RegionId, start: u64, end: u64) -> Result<usize> {
        let notes = self.midi_notes_mut(region)?;
        let before = notes.len();
        notes.retain(|(_, note)| !(note.start >= start && note.start < end));
        Ok(before - notes.len())
    }

    fn automation_region_at(&self, track: TrackId, lane: u32, frame: u64) -> Option<RegionId> {
        self.regions
            .values()
            .filter(|r| {
                r.track == track
                    && r.placement == RegionPlacement::Automation(lane)
                    && r.start <= frame
                    && frame <= r.end
            })
            .max_by_key(|r| r.start)
            .map(|r| r.id)
    }

    fn add_automation_point(&mut self, region: RegionId, point: AutomationPoint) -> Result<()> {
        let points = self.automation_points_mut(region)?;
        match points.binary_search_by_key(&point.position, |p| p.position) {
            Ok(index) => points[index].value = point.value,
            Err(index) => points.insert(index, point),
        }
        Ok(())
    }

    fn remove_automation_points(
        &mut self,
        region: RegionId,
        after: u64,
        until: u64,
    ) -> Result<usize> {
        let points = self.automation_points_mut(region)?;
        let before = points.len();
        points.retain(|p| !(p.position > after && p.position <= until));
        Ok(before - points.len())
    }

    fn selection(&self) -> SelectionSnapshot {
        SelectionSnapshot::new(self.selection.iter().copied())
    }

    fn select_regions(&mut self, regions: &[RegionId]) {
        self.selection = regions
            .iter()
            .copied()
            .filter(|id| self.regions.contains_key(id))
            .collect();
    }
}
