//! Producer -> queue -> manager -> project, driven one cycle at a time.
//!
//! Pattern: manual cycle control with a dummy transport, checking the
//! project model and undo history after each drain.

use crate::helpers::*;
use takeline::prelude::*;
use takeline::AutomationRecordMode;

/// Contiguous audio cycles land in one region, sample for sample.
#[test]
fn test_audio_cycles_concatenate() {
    let mut pipe = Pipeline::new(RecordingMode::MergeEvents);
    let track = pipe.project.add_audio_track("Vox");
    let transport = TransportState::recording();

    for cycle in 0..3u64 {
        let start = cycle * TEST_BLOCK as u64;
        let samples = staircase(start, TEST_BLOCK as usize);
        let outcome = pipe.cycle(&audio_input(track, &samples), start, TEST_BLOCK, &transport);
        assert_eq!(outcome.dropped, 0);
    }
    pipe.cycle(&audio_input(track, &[]), 384, 0, &TransportState::stopped());

    let report = pipe.drain();
    assert_eq!(report.discarded, 0);

    let regions = pipe.project.regions_on_track(track);
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].start(), 0);
    assert_eq!(regions[0].length(), 384);
    let (left, right) = regions[0].audio().unwrap();
    assert_eq!(left, staircase(0, 384).as_slice());
    assert_eq!(left[128], 128.0);
    assert_eq!(left, right);
    assert_eq!(pipe.undo.len(), 1);
}

/// Note-on at offset 10, note-off 50 frames later, then stop.
#[test]
fn test_recorded_note_and_undo_action() {
    let mut pipe = Pipeline::new(RecordingMode::MergeEvents);
    let track = pipe.project.add_midi_track("Keys");
    let transport = TransportState::recording();

    let events = [
        MidiEvent::note_on(10, 0, 60, 100),
        MidiEvent::note_off(60, 0, 60, 0),
    ];
    pipe.cycle(&midi_input(track, &events), 0, TEST_BLOCK, &transport);
    pipe.cycle(&midi_input(track, &[]), 128, TEST_BLOCK, &transport);
    pipe.cycle(&midi_input(track, &[]), 256, TEST_BLOCK, &TransportState::stopped());
    pipe.drain();

    let regions = pipe.project.regions_on_track(track);
    assert_eq!(regions.len(), 1);
    let notes = regions[0].notes();
    assert_eq!(notes.len(), 1);
    assert_eq!((notes[0].pitch, notes[0].velocity), (60, 100));
    assert_eq!(notes[0].start, 10);
    assert_eq!(notes[0].length(), 50);

    assert_eq!(pipe.undo.len(), 1);
    let action = pipe.undo.last().unwrap();
    assert_eq!(action.regions, vec![regions[0].id()]);
    assert!(action.after.contains(regions[0].id()));
}

/// Events outside the punch range are never recorded.
#[test]
fn test_punch_range_bounds_region() {
    let mut pipe = Pipeline::new(RecordingMode::MergeEvents);
    let track = pipe.project.add_audio_track("Gtr");
    let transport = TransportState::recording().with_punch(256, 512);

    for cycle in 0..6u64 {
        let start = cycle * 128;
        let samples = staircase(start, 128);
        pipe.cycle(&audio_input(track, &samples), start, 128, &transport);
    }
    pipe.cycle(&audio_input(track, &[]), 768, 0, &TransportState::stopped());
    pipe.drain();

    let regions = pipe.project.regions_on_track(track);
    assert_eq!(regions.len(), 1);
    assert_eq!((regions[0].start(), regions[0].end()), (256, 512));
    assert_eq!(regions[0].audio().unwrap().0[0], 256.0);
}

/// A zero-length cycle (loop wrap) pauses; merge mode keeps one region.
#[test]
fn test_loop_wrap_merges_midi() {
    let mut pipe = Pipeline::new(RecordingMode::MergeEvents);
    let track = pipe.project.add_midi_track("Keys");
    let transport = TransportState::recording();

    pipe.cycle(&midi_input(track, &[MidiEvent::note_on(0, 0, 60, 90)]), 0, 128, &transport);
    pipe.cycle(&midi_input(track, &[MidiEvent::note_off(0, 0, 60, 0)]), 128, 128, &transport);
    pipe.cycle(&midi_input(track, &[]), 256, 0, &transport);
    pipe.cycle(&midi_input(track, &[MidiEvent::note_on(64, 0, 67, 90)]), 0, 128, &transport);
    pipe.cycle(&midi_input(track, &[]), 128, 0, &TransportState::stopped());
    let report = pipe.drain();
    assert_eq!(report.discarded, 0);

    let regions = pipe.project.regions_on_track(track);
    assert_eq!(regions.len(), 1);
    let pitches: Vec<u8> = regions[0].notes().iter().map(|n| n.pitch).collect();
    assert_eq!(pitches, vec![60, 67]);
    assert_eq!(regions[0].notes()[0].length(), 128);
    assert_eq!(pipe.undo.len(), 1);
}

/// Each loop pass becomes its own take; earlier takes are muted.
#[test]
fn test_loop_wrap_records_muted_takes() {
    let mut pipe = Pipeline::new(RecordingMode::TakesMuted);
    let track = pipe.project.add_audio_track("Vox");
    let transport = TransportState::recording();
    let block = staircase(0, 128);

    for _pass in 0..2 {
        pipe.cycle(&audio_input(track, &block), 0, 128, &transport);
        pipe.cycle(&audio_input(track, &block), 128, 0, &transport);
    }
    pipe.cycle(&audio_input(track, &[]), 128, 0, &TransportState::stopped());
    pipe.drain();

    let regions = pipe.project.regions_on_track(track);
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].name(), "Vox - lane 1 - recording");
    assert_eq!(regions[1].name(), "Vox - lane 2 - recording");
    assert!(regions[0].is_muted());
    assert!(!regions[1].is_muted());
    assert_eq!(pipe.undo.last().unwrap().regions.len(), 2);
}

/// Events the pool cannot hold are dropped and counted; the consumer sees
/// the hole as a gap afterwards.
#[test]
fn test_pool_exhaustion_drops_then_gap() {
    let mut pipe = small_pool_pipeline();
    let track = pipe.project.add_audio_track("Drums");
    let transport = TransportState::recording();
    let block = vec![0.5f32; 128];

    let mut dropped = 0;
    for cycle in 0..5u64 {
        dropped += pipe.cycle(&audio_input(track, &block), cycle * 128, 128, &transport).dropped;
    }
    assert_eq!(dropped, 2);
    assert_eq!(pipe.drain().processed, 4);
    assert_eq!(pipe.manager.free_events(), 4);

    pipe.cycle(&audio_input(track, &block), 640, 128, &transport);
    pipe.cycle(&audio_input(track, &[]), 768, 0, &TransportState::stopped());
    pipe.drain();

    let snapshot = pipe.manager.metrics().snapshot();
    assert_eq!(snapshot.pool_exhausted, 2);
    assert_eq!(snapshot.gaps, 1);
    let regions = pipe.project.regions_on_track(track);
    assert_eq!(regions.len(), 1);
    assert_eq!((regions[0].start(), regions[0].end()), (0, 384));
    assert_eq!(pipe.undo.len(), 1);
}

fn small_pool_pipeline() -> Pipeline {
    let config = RecordingConfig::builder()
        .max_block_length(256)
        .event_capacity(4)
        .max_tracks(4)
        .build()
        .unwrap();
    Pipeline::with_config(config)
}

/// A Stop lost to a full pool is sent again on the next stopped cycle, so
/// the pass still ends with one undo action and the next pass starts fresh.
#[test]
fn test_dropped_stop_still_ends_pass() {
    let mut pipe = small_pool_pipeline();
    let track = pipe.project.add_midi_track("Keys");
    let transport = TransportState::recording();
    let stopped = TransportState::stopped();

    for cycle in 0..3u64 {
        pipe.cycle(&midi_input(track, &[]), cycle * 128, 128, &transport);
    }
    let outcome = pipe.cycle(&midi_input(track, &[]), 384, 128, &stopped);
    assert_eq!(outcome.dropped, 1);
    assert_eq!(pipe.drain().processed, 4);
    assert!(pipe.manager.is_recording());
    assert!(pipe.undo.is_empty());

    let outcome = pipe.cycle(&midi_input(track, &[]), 512, 128, &stopped);
    assert_eq!(outcome.pushed, 1);
    pipe.drain();
    assert!(!pipe.manager.is_recording());
    assert_eq!(pipe.undo.len(), 1);
    let regions = pipe.project.regions_on_track(track);
    assert_eq!(regions.len(), 1);
    assert_eq!((regions[0].start(), regions[0].end()), (0, 384));

    pipe.cycle(&midi_input(track, &[]), 1024, 128, &transport);
    pipe.cycle(&midi_input(track, &[]), 1152, 128, &stopped);
    pipe.drain();
    assert_eq!(pipe.project.regions_on_track(track).len(), 2);
    assert_eq!(pipe.undo.len(), 2);
}

/// A Pause lost at the loop wrap is sent ahead of the next data, so the
/// take resumes in place instead of hitting a gap.
#[test]
fn test_dropped_pause_resumes_cleanly() {
    let mut pipe = small_pool_pipeline();
    let track = pipe.project.add_midi_track("Keys");
    let transport = TransportState::recording();

    let first = [MidiEvent::note_on(0, 0, 60, 90)];
    pipe.cycle(&midi_input(track, &first), 0, 128, &transport);
    pipe.cycle(&midi_input(track, &[]), 128, 128, &transport);
    pipe.cycle(&midi_input(track, &[]), 256, 128, &transport);
    let outcome = pipe.cycle(&midi_input(track, &[]), 384, 0, &transport);
    assert_eq!(outcome.dropped, 1);
    assert_eq!(pipe.drain().processed, 4);

    let second = [MidiEvent::note_on(64, 0, 67, 90)];
    pipe.cycle(&midi_input(track, &second), 0, 128, &transport);
    pipe.cycle(&midi_input(track, &[]), 128, 0, &TransportState::stopped());
    let report = pipe.drain();
    assert_eq!(report.discarded, 0);

    assert_eq!(pipe.manager.metrics().snapshot().gaps, 0);
    let regions = pipe.project.regions_on_track(track);
    assert_eq!(regions.len(), 1);
    let pitches: Vec<u8> = regions[0].notes().iter().map(|n| n.pitch).collect();
    assert_eq!(pitches, vec![60, 67]);
    assert_eq!(regions[0].notes()[0].length(), 384);
    assert_eq!(pipe.undo.len(), 1);
}

/// The before/after selection brackets each pass.
#[test]
fn test_undo_actions_carry_selection() {
    let mut pipe = Pipeline::new(RecordingMode::MergeEvents);
    let track = pipe.project.add_midi_track("Keys");
    let transport = TransportState::recording();

    for pass in 0..2u64 {
        let start = pass * 1024;
        pipe.cycle(&midi_input(track, &[]), start, 128, &transport);
        pipe.cycle(&midi_input(track, &[]), start + 128, 0, &TransportState::stopped());
        pipe.drain();
    }

    let actions = pipe.undo.actions();
    assert_eq!(actions.len(), 2);
    let first = actions[0].regions[0];
    let second = actions[1].regions[0];
    assert_ne!(first, second);
    assert!(actions[0].before.is_empty());
    assert!(actions[1].before.contains(first));
    assert!(actions[1].after.contains(second));
    assert!(!actions[1].after.contains(first));

    let undone = pipe.undo.undo().unwrap();
    assert_eq!(undone.regions, vec![second]);
    assert!(pipe.undo.can_redo());
}

/// Latch automation follows value changes while the transport rolls,
/// independent of the track being armed.
#[test]
fn test_latch_automation_from_cycles() {
    let mut pipe = Pipeline::new(RecordingMode::MergeEvents);
    let track = pipe.project.add_midi_track("Pad");
    let lane = pipe
        .project
        .add_automation_lane(track, AutomationRecordMode::Latch)
        .unwrap();
    let rolling = TransportState {
        record_enabled: false,
        rolling: true,
        punch: None,
    };

    let values = [0.0, 0.0, 0.5, 0.5, 1.0];
    for (cycle, &value) in values.iter().enumerate() {
        let automation = [AutomationInput {
            lane,
            recording: true,
            value,
            touching: false,
        }];
        let input = TrackCycleInput {
            track,
            armed: false,
            content: TrackContent::None,
            automation: &automation,
        };
        pipe.cycle(&input, cycle as u64 * 128, 128, &rolling);
    }
    let automation = [AutomationInput {
        lane,
        recording: false,
        value: 1.0,
        touching: false,
    }];
    let input = TrackCycleInput {
        track,
        armed: false,
        content: TrackContent::None,
        automation: &automation,
    };
    pipe.cycle(&input, 640, 128, &rolling);
    pipe.drain();

    assert!(pipe.project.regions_on_track(track).is_empty());
    let regions = pipe.project.automation_regions(track, lane);
    assert_eq!(regions.len(), 1);
    assert_eq!((regions[0].start(), regions[0].end()), (0, 640));
    let positions: Vec<u64> = regions[0]
        .automation_points()
        .iter()
        .map(|p| p.position)
        .collect();
    assert_eq!(positions, vec![0, 256, 512]);
    approx::assert_relative_eq!(regions[0].automation_points()[2].value, 1.0);
    assert_eq!(pipe.undo.len(), 1);
}

/// Events for tracks the project does not know are discarded, not applied.
#[test]
fn test_unknown_track_discarded() {
    let mut pipe = Pipeline::new(RecordingMode::MergeEvents);
    let ghost = TrackId(77);
    let transport = TransportState::recording();

    pipe.cycle(&midi_input(ghost, &[]), 0, 128, &transport);
    let report = pipe.drain();

    assert_eq!(report.processed, 0);
    assert_eq!(report.discarded, 2);
    assert_eq!(pipe.manager.metrics().snapshot().unresolved, 2);
    assert_eq!(pipe.project.region_count(), 0);
    assert!(!pipe.manager.is_recording());
}
