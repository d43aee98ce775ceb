//! Automation lane recording.

use super::state::{Continuity, EntityState, FrameCursor, LaneRecording};
use super::RecordingManager;
use crate::event::CycleTime;
use crate::model::{
    AutomationPoint, AutomationRecordMode, NewRegion, ProjectModel, RegionKind, RegionPlacement,
    TrackId,
};
use crate::undo::UndoSink;
use crate::{Error, Result};
use tracing::{debug, warn};

impl RecordingManager {
    pub(super) fn start_lane(
        &mut self,
        project: &mut dyn ProjectModel,
        track: TrackId,
        lane: u32,
        time: CycleTime,
    ) -> Result<()> {
        if self.lanes.contains_key(&(track, lane)) {
            warn!(
                "Automation record start already processed for {} lane {}, ignoring",
                track, lane
            );
            return Ok(());
        }
        self.open_lane(project, track, lane, time)
    }

    fn open_lane(
        &mut self,
        project: &mut dyn ProjectModel,
        track: TrackId,
        lane: u32,
        time: CycleTime,
    ) -> Result<()> {
        let mode = project.automation_mode(track, lane).ok_or_else(|| {
            Error::MalformedEvent(format!("{} has no automation lane {}", track, lane))
        })?;
        self.begin_entity(project);
        self.lanes.insert(
            (track, lane),
            LaneRecording::new(mode, time.global_start_frame),
        );
        debug!(
            "Started automation recording on {} lane {} ({:?})",
            track, lane, mode
        );
        Ok(())
    }

    pub(super) fn record_automation(
        &mut self,
        project: &mut dyn ProjectModel,
        track: TrackId,
        lane: u32,
        time: CycleTime,
        value: f32,
        touching: bool,
    ) -> Result<()> {
        let key = (track, lane);
        let start = time.global_start_frame;
        let end = time.end_frame();

        match self.lanes.get(&key).map(|rec| rec.state) {
            None | Some(EntityState::Idle) => self.open_lane(project, track, lane, time)?,
            Some(EntityState::Paused) => {
                if let Some(rec) = self.lanes.get_mut(&key) {
                    rec.state = EntityState::Recording;
                    rec.cursor = FrameCursor::at(start);
                    rec.region = None;
                    rec.last_value = None;
                    debug!("Resumed automation recording on {} lane {}", track, lane);
                }
            }
            Some(EntityState::Recording) => {}
        }

        let rec = self
            .lanes
            .get_mut(&key)
            .ok_or_else(|| {
                Error::MalformedEvent(format!("{} lane {} not recording", track, lane))
            })?;

        if let Continuity::Gap { expected } = rec.cursor.check(start, end, false) {
            if !rec.gap_logged {
                rec.gap_logged = true;
                warn!(
                    "Discarding non-contiguous automation event on {} lane {}: expected frame {}, got {} (further gaps on this lane are not logged)",
                    track, lane, expected, start
                );
            }
            rec.state = EntityState::Paused;
            return Err(Error::Gap {
                entity: format!("{} lane {}", track, lane),
                event: "automation",
                expected,
                actual: start,
            });
        }
        rec.cursor.advance(start, end);

        if let Some(mode) = project.automation_mode(track, lane) {
            rec.mode = mode;
        }
        if rec.mode == AutomationRecordMode::Touch && !touching {
            rec.last_point = None;
            rec.last_value = None;
            return Ok(());
        }

        let changed = rec
            .last_value
            .map_or(true, |last| (last - value).abs() > f32::EPSILON);

        let covering = rec
            .region
            .filter(|&region| {
                project
                    .region_bounds(region)
                    .is_some_and(|(s, e)| s <= start && start <= e)
            })
            .or_else(|| project.automation_region_at(track, lane, start));

        let region = match covering {
            Some(region) => region,
            None if changed => {
                let region = project.create_region(NewRegion {
                    track,
                    placement: RegionPlacement::Automation(lane),
                    kind: RegionKind::Automation,
                    start_frame: start,
                    end_frame: end,
                    name: None,
                })?;
                self.recorded.push(region);
                debug!(
                    "Created automation region {} on {} lane {} at frame {}",
                    region, track, lane, start
                );
                region
            }
            // unchanged value and nothing to hold it in
            None => return Ok(()),
        };

        let rec = self
            .lanes
            .get_mut(&key)
            .ok_or_else(|| {
                Error::MalformedEvent(format!("{} lane {} not recording", track, lane))
            })?;
        rec.region = Some(region);

        let (region_start, region_end) = project
            .region_bounds(region)
            .ok_or(Error::UnknownRegion(region))?;
        if end > region_end {
            project.set_region_end(region, end)?;
        }
        if !changed {
            return Ok(());
        }

        if rec.last_point != Some((start, value)) {
            let position = start - region_start;
            if let Some((last, _)) = rec.last_point.filter(|&(last, _)| last >= region_start) {
                project.remove_automation_points(region, last - region_start, position)?;
            }
            project.add_automation_point(region, AutomationPoint { position, value })?;
            rec.last_point = Some((start, value));
        }
        rec.last_value = Some(value);
        Ok(())
    }

    pub(super) fn pause_lane(&mut self, track: TrackId, lane: u32) {
        match self.lanes.get_mut(&(track, lane)) {
            Some(rec) => {
                if rec.state != EntityState::Paused {
                    rec.state = EntityState::Paused;
                    debug!("Paused automation recording on {} lane {}", track, lane);
                }
            }
            None => debug!("Pause for idle {} lane {} ignored", track, lane),
        }
    }

    pub(super) fn stop_lane(
        &mut self,
        project: &mut dyn ProjectModel,
        undo: &mut dyn UndoSink,
        track: TrackId,
        lane: u32,
    ) {
        if self.lanes.remove(&(track, lane)).is_none() {
            debug!("Stop for idle {} lane {} ignored", track, lane);
            return;
        }
        debug!("Stopped automation recording on {} lane {}", track, lane);
        self.finish_entity(project, undo);
    }
}
