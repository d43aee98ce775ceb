//! Worker thread integration tests
//!
//! Audio threads push through their own producers while the worker drains
//! concurrently, the way an engine runs recording.

use crate::helpers::*;
use std::thread;
use takeline::prelude::*;

const CYCLES: u64 = 50;

/// One audio thread per track; every track ends up with its full take.
#[test]
fn test_concurrent_producers_keep_per_track_order() {
    let manager = test_manager(RecordingMode::MergeEvents);
    let producer = manager.producer();
    let mut project = Tracklist::new();
    let tracks: Vec<TrackId> = (0..4)
        .map(|i| project.add_audio_track(format!("Track {}", i + 1)))
        .collect();
    let mut worker = RecordingWorker::spawn(manager, project, UndoStack::new()).unwrap();

    let audio_threads: Vec<_> = tracks
        .iter()
        .map(|&track| {
            let mut producer = producer.clone();
            thread::spawn(move || {
                let transport = TransportState::recording();
                for cycle in 0..CYCLES {
                    let start = cycle * TEST_BLOCK as u64;
                    let samples = staircase(start, TEST_BLOCK as usize);
                    let outcome = producer.handle_recording(
                        &audio_input(track, &samples),
                        CycleTime::new(start, 0, TEST_BLOCK),
                        &transport,
                    );
                    assert_eq!(outcome.dropped, 0);
                    // give the worker a chance to keep the pool from filling
                    thread::yield_now();
                }
                let end = CYCLES * TEST_BLOCK as u64;
                producer.handle_recording(
                    &audio_input(track, &[]),
                    CycleTime::new(end, 0, 0),
                    &TransportState::stopped(),
                );
            })
        })
        .collect();
    for handle in audio_threads {
        handle.join().unwrap();
    }

    let undo = worker.undo();
    assert!(wait_for(5000, || {
        worker.request_drain();
        undo.lock().actions().iter().map(|a| a.regions.len()).sum::<usize>() == tracks.len()
    }));
    assert_eq!(worker.metrics().snapshot().dropped(), 0);
    assert_eq!(worker.metrics().snapshot().discarded(), 0);

    let project = worker.project();
    let project = project.lock();
    for &track in &tracks {
        let regions = project.regions_on_track(track);
        assert_eq!(regions.len(), 1, "{} should have one take", track);
        let (left, _) = regions[0].audio().unwrap();
        assert_eq!(left, staircase(0, (CYCLES * TEST_BLOCK as u64) as usize).as_slice());
    }
    drop(project);

    let manager = worker.stop().unwrap();
    assert!(!manager.is_recording());
    assert_eq!(manager.free_events(), manager.config().pool_capacity);
}

/// Shutdown while an audio thread keeps pushing: later pushes are rejected and
/// every event returns to the pool.
#[test]
fn test_shutdown_while_recording_releases_everything() {
    let manager = test_manager(RecordingMode::MergeEvents);
    let producer = manager.producer();
    let teardown = manager.teardown_handle();
    let mut project = Tracklist::new();
    let track = project.add_midi_track("Keys");
    let mut worker = RecordingWorker::spawn(manager, project, UndoStack::new()).unwrap();

    let audio_thread = {
        let mut producer = producer.clone();
        thread::spawn(move || {
            let transport = TransportState::recording();
            let mut cycle = 0u64;
            while producer.is_accepting() {
                producer.handle_recording(
                    &midi_input(track, &[]),
                    CycleTime::new(cycle * 64, 0, 64),
                    &transport,
                );
                cycle += 1;
                thread::sleep(std::time::Duration::from_micros(200));
            }
            cycle
        })
    };

    assert!(wait_for(5000, || worker.metrics().snapshot().processed > 10));
    teardown.request_shutdown();
    assert!(teardown.wait_idle_for(std::time::Duration::from_secs(5)));
    let cycles = audio_thread.join().unwrap();
    assert!(cycles >= 10);

    let late = takeline::RecordingEventKind::Midi(None);
    assert!(!producer.push(track, CycleTime::new(0, 0, 64), late));

    let mut manager = worker.stop().unwrap();
    assert_eq!(manager.pending_events(), 0);
    manager.teardown();
    assert_eq!(manager.free_events(), manager.config().pool_capacity);
    assert!(worker.project().lock().region_count() >= 1);
}
