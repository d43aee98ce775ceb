//! Track (MIDI and audio) recording.

use super::state::{Continuity, EntityState, FrameCursor, TrackRecording, UnendedNote};
use super::{recording_clip_name, RecordingManager};
use crate::config::RecordingMode;
use crate::event::{CycleTime, MidiEvent};
use crate::model::{
    NewRegion, Note, ProjectModel, RegionId, RegionKind, RegionPlacement, TrackId, TrackKind,
};
use crate::undo::UndoSink;
use crate::{Error, Result};
use tracing::{debug, warn};

impl RecordingManager {
    pub(super) fn start_track(
        &mut self,
        project: &mut dyn ProjectModel,
        track: TrackId,
        kind: TrackKind,
        time: CycleTime,
    ) -> Result<()> {
        if self.tracks.contains_key(&track) {
            warn!("Record start already processed for {}, ignoring", track);
            return Ok(());
        }
        self.open_track(project, track, kind, time)
    }

    /// Idle -> Recording with a fresh region on the track's last lane.
    fn open_track(
        &mut self,
        project: &mut dyn ProjectModel,
        track: TrackId,
        kind: TrackKind,
        time: CycleTime,
    ) -> Result<()> {
        let lane = project.lane_count(track).saturating_sub(1);
        let start = time.global_start_frame;
        let region = create_track_region(project, track, kind, lane, start)?;

        self.begin_entity(project);
        self.recorded.push(region);
        self.tracks
            .insert(track, TrackRecording::new(region, lane, start));
        debug!(
            "Started recording {} into {} (lane {}) at frame {}",
            track, region, lane, start
        );
        Ok(())
    }

    /// Start or resume `track` so a data event can be appended.
    fn prepare_track(
        &mut self,
        project: &mut dyn ProjectModel,
        track: TrackId,
        kind: TrackKind,
        time: CycleTime,
    ) -> Result<()> {
        match self.tracks.get(&track).map(|rec| rec.state) {
            None | Some(EntityState::Idle) => {
                debug!("Implicit record start for {}", track);
                self.open_track(project, track, kind, time)
            }
            Some(EntityState::Paused) => self.resume_track(project, track, kind, time),
            Some(EntityState::Recording) => Ok(()),
        }
    }

    fn resume_track(
        &mut self,
        project: &mut dyn ProjectModel,
        track: TrackId,
        kind: TrackKind,
        time: CycleTime,
    ) -> Result<()> {
        let mode = self.config.mode;
        let position = time.global_start_frame;
        let Some(rec) = self.tracks.get(&track) else {
            return Ok(());
        };
        let (previous, lane) = (rec.region, rec.lane);
        let audio_moved = kind == TrackKind::Audio && position != rec.cursor.next();

        if mode.creates_takes() || audio_moved {
            let next_lane = lane + 1;
            let region = create_track_region(project, track, kind, next_lane, position)?;
            if mode == RecordingMode::TakesMuted
                || (audio_moved && mode == RecordingMode::OverwriteEvents)
            {
                project.set_region_muted(previous, true)?;
            }
            self.recorded.push(region);
            if let Some(rec) = self.tracks.get_mut(&track) {
                rec.region = region;
                rec.lane = next_lane;
                rec.unended.clear();
            }
            debug!(
                "Resumed {} with new take {} on lane {} at frame {}",
                track, region, next_lane, position
            );
        } else {
            let (start, _) = project
                .region_bounds(previous)
                .ok_or(Error::UnknownRegion(previous))?;
            if position < start {
                project.move_region_start(previous, position)?;
            }
            debug!("Resumed {} in {} at frame {}", track, previous, position);
        }

        if let Some(rec) = self.tracks.get_mut(&track) {
            rec.state = EntityState::Recording;
            rec.cursor = FrameCursor::at(position);
        }
        Ok(())
    }

    /// Check `time` against the track cursor and advance it.
    ///
    /// A gap pauses the track (ending held notes) so the next event resumes.
    fn accept_track_range(
        &mut self,
        project: &mut dyn ProjectModel,
        track: TrackId,
        time: CycleTime,
        kind: TrackKind,
    ) -> Result<(Continuity, RegionId)> {
        // several MIDI events may share one cycle
        let (event, same_cycle_ok) = match kind {
            TrackKind::Midi => ("midi", true),
            TrackKind::Audio => ("audio", false),
        };
        let rec = self
            .tracks
            .get_mut(&track)
            .ok_or(Error::UnknownTrack(track))?;
        let start = time.global_start_frame;
        let end = time.end_frame();

        match rec.cursor.check(start, end, same_cycle_ok) {
            Continuity::Gap { expected } => {
                if !rec.gap_logged {
                    rec.gap_logged = true;
                    warn!(
                        "Discarding non-contiguous {} event on {}: expected frame {}, got {} (further gaps on this track are not logged)",
                        event, track, expected, start
                    );
                }
                rec.state = EntityState::Paused;
                end_unended_notes(project, rec, expected)?;
                Err(Error::Gap {
                    entity: track.to_string(),
                    event,
                    expected,
                    actual: start,
                })
            }
            continuity => {
                rec.cursor.advance(start, end);
                Ok((continuity, rec.region))
            }
        }
    }

    pub(super) fn record_midi(
        &mut self,
        project: &mut dyn ProjectModel,
        track: TrackId,
        time: CycleTime,
        midi: Option<MidiEvent>,
    ) -> Result<()> {
        self.prepare_track(project, track, TrackKind::Midi, time)?;
        let (continuity, region) = self.accept_track_range(project, track, time, TrackKind::Midi)?;
        let overwrite = self.config.mode == RecordingMode::OverwriteEvents;

        let (mut region_start, region_end) = project
            .region_bounds(region)
            .ok_or(Error::UnknownRegion(region))?;
        let start = time.global_start_frame;
        let end = time.end_frame();
        if start < region_start {
            project.move_region_start(region, start)?;
            region_start = start;
        }
        if end > region_end {
            project.set_region_end(region, end)?;
        }

        let range_start = start - region_start;
        let range_end = end - region_start;
        if overwrite && continuity == Continuity::NewCycle {
            let removed = project.remove_notes_in(region, range_start, range_end)?;
            if removed > 0 {
                debug!("Overwrote {} notes in {}", removed, region);
            }
        }

        let Some(rec) = self.tracks.get_mut(&track) else {
            return Ok(());
        };
        for note in &rec.unended {
            project.set_note_end(region, note.id, range_end)?;
        }

        let Some(midi) = midi else {
            return Ok(());
        };
        let position = time.absolute(midi.frame_offset) - region_start;
        let channel = midi.channel_num();
        let held = |rec: &TrackRecording, pitch: u8| {
            rec.unended
                .iter()
                .position(|n| n.pitch == pitch && n.channel == channel)
        };

        if midi.is_note_on() {
            let (Some(pitch), Some(velocity)) = (midi.note(), midi.velocity()) else {
                return Ok(());
            };
            if let Some(index) = held(&*rec, pitch) {
                let retriggered = rec.unended.remove(index);
                project.set_note_end(region, retriggered.id, position)?;
            }
            let id = project.add_note(
                region,
                Note {
                    start: position,
                    end: range_end.max(position + 1),
                    pitch,
                    velocity,
                    channel,
                },
            )?;
            rec.unended.push(UnendedNote { id, pitch, channel });
        } else if midi.is_note_off() {
            let Some(pitch) = midi.note() else {
                return Ok(());
            };
            match held(&*rec, pitch) {
                Some(index) => {
                    let note = rec.unended.remove(index);
                    project.set_note_end(region, note.id, position)?;
                }
                None => debug!("Note-off for {} without a recorded note-on on {}", pitch, track),
            }
        }
        Ok(())
    }

    pub(super) fn record_audio(
        &mut self,
        project: &mut dyn ProjectModel,
        track: TrackId,
        time: CycleTime,
        left: &[f32],
        right: &[f32],
    ) -> Result<()> {
        self.prepare_track(project, track, TrackKind::Audio, time)?;
        let (_, region) = self.accept_track_range(project, track, time, TrackKind::Audio)?;

        let (start, _) = project
            .region_bounds(region)
            .ok_or(Error::UnknownRegion(region))?;
        let length = project.append_audio(region, left, right)?;
        project.set_region_end(region, start + length)
    }

    pub(super) fn pause_track(
        &mut self,
        project: &mut dyn ProjectModel,
        track: TrackId,
        time: CycleTime,
    ) -> Result<()> {
        let Some(rec) = self.tracks.get_mut(&track) else {
            debug!("Pause for idle {} ignored", track);
            return Ok(());
        };
        if rec.state == EntityState::Paused {
            return Ok(());
        }
        rec.state = EntityState::Paused;
        let position = time.global_start_frame.min(rec.cursor.next());
        debug!("Paused recording {} at frame {}", track, position);
        end_unended_notes(project, rec, position)
    }

    pub(super) fn stop_track(
        &mut self,
        project: &mut dyn ProjectModel,
        undo: &mut dyn UndoSink,
        track: TrackId,
    ) -> Result<()> {
        let Some(mut rec) = self.tracks.remove(&track) else {
            debug!("Stop for idle {} ignored", track);
            return Ok(());
        };
        let end = rec.cursor.next();
        let ended = end_unended_notes(project, &mut rec, end);
        debug!("Stopped recording {} into {}", track, rec.region);

        self.finish_entity(project, undo);
        ended
    }
}

fn create_track_region(
    project: &mut dyn ProjectModel,
    track: TrackId,
    kind: TrackKind,
    lane: usize,
    start: u64,
) -> Result<RegionId> {
    let (region_kind, name) = match kind {
        TrackKind::Midi => (RegionKind::Midi, None),
        TrackKind::Audio => {
            let track_name = project.track_name(track).unwrap_or("Audio");
            (RegionKind::Audio, Some(recording_clip_name(track_name, lane)))
        }
    };
    project.create_region(NewRegion {
        track,
        placement: RegionPlacement::Lane(lane),
        kind: region_kind,
        start_frame: start,
        end_frame: start,
        name,
    })
}

/// End every held note at absolute frame `position`.
fn end_unended_notes(
    project: &mut dyn ProjectModel,
    rec: &mut TrackRecording,
    position: u64,
) -> Result<()> {
    if rec.unended.is_empty() {
        return Ok(());
    }
    let region = rec.region;
    let (start, _) = project
        .region_bounds(region)
        .ok_or(Error::UnknownRegion(region))?;
    let relative = position.saturating_sub(start);
    for note in rec.unended.drain(..) {
        project.set_note_end(region, note.id, relative)?;
    }
    Ok(())
}
