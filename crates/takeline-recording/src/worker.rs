//! Background thread that drains recording events on a fixed interval.

use crate::manager::{DrainReport, RecordingManager};
use crate::metrics::RecordingMetrics;
use crate::model::ProjectModel;
use crate::shared::TeardownHandle;
use crate::undo::UndoSink;
use crate::{Error, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use takeline_core::AtomicFlag;
use tracing::{debug, info, warn};

const COMMAND_CAPACITY: usize = 16;

pub(crate) enum WorkerCommand {
    /// Drain now instead of waiting for the next tick.
    Drain { ack: Option<Sender<DrainReport>> },
    Shutdown,
}

/// Owns a [`RecordingManager`] on its own thread and calls
/// [`process_events`](RecordingManager::process_events) every
/// `drain_interval`.
///
/// The project and undo sink are shared behind mutexes so the UI side can
/// read them between drains.
///
/// ```
/// use takeline_recording::{
///     CycleTime, RecordingConfig, RecordingManager, RecordingWorker, StereoInput,
///     TrackContent, TrackCycleInput, Tracklist, TransportState, UndoStack,
/// };
///
/// let manager = RecordingManager::new(RecordingConfig::for_testing())?;
/// let mut producer = manager.producer();
/// let mut project = Tracklist::new();
/// let track = project.add_audio_track("Vox");
/// let mut worker = RecordingWorker::spawn(manager, project, UndoStack::new())?;
///
/// let input = [0.25f32; 256];
/// let cycle = TrackCycleInput {
///     track,
///     armed: true,
///     content: TrackContent::Audio(StereoInput::mono(&input)),
///     automation: &[],
/// };
/// producer.handle_recording(&cycle, CycleTime::new(0, 0, 256), &TransportState::recording());
///
/// worker.drain_now();
/// assert_eq!(worker.project().lock().region_count(), 1);
/// worker.stop();
/// # Ok::<(), takeline_recording::Error>(())
/// ```
pub struct RecordingWorker<P, U>
where
    P: ProjectModel + Send + 'static,
    U: UndoSink + Send + 'static,
{
    command_tx: Sender<WorkerCommand>,
    project: Arc<Mutex<P>>,
    undo: Arc<Mutex<U>>,
    teardown: TeardownHandle,
    metrics: Arc<RecordingMetrics>,
    shutdown: Arc<AtomicFlag>,
    thread_handle: Option<JoinHandle<RecordingManager>>,
}

impl<P, U> RecordingWorker<P, U>
where
    P: ProjectModel + Send + 'static,
    U: UndoSink + Send + 'static,
{
    /// Move `manager` onto a new thread and start draining.
    pub fn spawn(manager: RecordingManager, project: P, undo: U) -> Result<Self> {
        let (tx, rx) = bounded(COMMAND_CAPACITY);
        let project = Arc::new(Mutex::new(project));
        let undo = Arc::new(Mutex::new(undo));
        let teardown = manager.teardown_handle();
        let metrics = manager.metrics();
        let shutdown = Arc::new(AtomicFlag::new(false));
        let interval = manager.config().drain_interval();

        let handle = {
            let project = Arc::clone(&project);
            let undo = Arc::clone(&undo);
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("takeline-recording".into())
                .spawn(move || worker_loop(manager, rx, project, undo, shutdown, interval))
                .map_err(Error::WorkerSpawn)?
        };
        info!("Recording worker started, draining every {:?}", interval);

        Ok(Self {
            command_tx: tx,
            project,
            undo,
            teardown,
            metrics,
            shutdown,
            thread_handle: Some(handle),
        })
    }

    /// Ask for an immediate drain without waiting for it. Returns `false` if
    /// the worker is gone or its command queue is full.
    pub fn request_drain(&self) -> bool {
        self.command_tx
            .try_send(WorkerCommand::Drain { ack: None })
            .is_ok()
    }

    /// Drain now and wait for the result.
    pub fn drain_now(&self) -> Option<DrainReport> {
        let (ack_tx, ack_rx) = bounded(1);
        self.command_tx
            .send(WorkerCommand::Drain { ack: Some(ack_tx) })
            .ok()?;
        ack_rx.recv().ok()
    }

    /// Stop the thread after a final drain and hand the manager back.
    ///
    /// Returns `None` if the worker was already stopped or its thread panicked.
    pub fn stop(&mut self) -> Option<RecordingManager> {
        let handle = self.thread_handle.take()?;
        self.shutdown.set(true);
        let _ = self.command_tx.send(WorkerCommand::Shutdown);

        match handle.join() {
            Ok(manager) => {
                info!("Recording worker stopped");
                Some(manager)
            }
            Err(_) => {
                warn!("Recording worker thread panicked");
                None
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some()
    }

    pub fn project(&self) -> Arc<Mutex<P>> {
        Arc::clone(&self.project)
    }

    pub fn undo(&self) -> Arc<Mutex<U>> {
        Arc::clone(&self.undo)
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        self.teardown.clone()
    }

    pub fn metrics(&self) -> Arc<RecordingMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl<P, U> Drop for RecordingWorker<P, U>
where
    P: ProjectModel + Send + 'static,
    U: UndoSink + Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop<P, U>(
    mut manager: RecordingManager,
    rx: Receiver<WorkerCommand>,
    project: Arc<Mutex<P>>,
    undo: Arc<Mutex<U>>,
    shutdown: Arc<AtomicFlag>,
    interval: Duration,
) -> RecordingManager
where
    P: ProjectModel,
    U: UndoSink,
{
    loop {
        if shutdown.get() {
            break;
        }

        match rx.recv_timeout(interval) {
            Ok(WorkerCommand::Drain { ack }) => {
                let report = drain(&mut manager, &project, &undo);
                if let Some(ack) = ack {
                    let _ = ack.send(report);
                }
            }
            Ok(WorkerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                drain(&mut manager, &project, &undo);
            }
        }
    }

    // events pushed before shutdown still reach the project
    drain(&mut manager, &project, &undo);
    manager
}

fn drain<P, U>(
    manager: &mut RecordingManager,
    project: &Mutex<P>,
    undo: &Mutex<U>,
) -> DrainReport
where
    P: ProjectModel,
    U: UndoSink,
{
    let mut project = project.lock();
    let mut undo = undo.lock();
    let report = manager.process_events(&mut *project, &mut *undo);
    if report != DrainReport::default() {
        debug!(
            "Drained recording events: {} processed, {} discarded, {} released",
            report.processed, report.discarded, report.released
        );
    }
    report
}

impl<P, U> std::fmt::Debug for RecordingWorker<P, U>
where
    P: ProjectModel + Send + 'static,
    U: UndoSink + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingWorker")
            .field("running", &self.is_running())
            .field("teardown", &self.teardown)
            .finish()
    }
}
