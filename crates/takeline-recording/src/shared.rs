//! State shared between producers (audio thread) and the recording manager.
//!
//! Only the queue and pool cross threads on the hot path. The processing
//! gate is touched by the consumer and by teardown, never by the audio thread.

use crate::config::RecordingConfig;
use crate::event::RecordingEvent;
use crate::metrics::RecordingMetrics;
use crate::Result;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;
use takeline_core::{AtomicFlag, MpmcQueue, ObjectPool, PoolHandle};

pub(crate) struct RecordingShared {
    pub(crate) pool: ObjectPool<RecordingEvent>,
    pub(crate) queue: MpmcQueue<PoolHandle>,
    pub(crate) metrics: Arc<RecordingMetrics>,
    /// Set once teardown starts; producers reject every push afterwards.
    pub(crate) freeing: AtomicFlag,
    pub(crate) gate: ProcessingGate,
}

impl RecordingShared {
    pub(crate) fn new(config: &RecordingConfig) -> Result<Self> {
        let block_length = config.max_block_length;
        Ok(Self {
            pool: ObjectPool::new(config.pool_capacity, || {
                RecordingEvent::with_block_length(block_length)
            })?,
            queue: MpmcQueue::with_capacity(config.queue_capacity)?,
            metrics: Arc::new(RecordingMetrics::new()),
            freeing: AtomicFlag::new(false),
            gate: ProcessingGate::default(),
        })
    }
}

/// "Currently processing" flag plus a completion signal.
#[derive(Default)]
pub(crate) struct ProcessingGate {
    busy: Mutex<bool>,
    idle: Condvar,
}

impl ProcessingGate {
    /// Mark a drain as in flight. `None` if one already is.
    pub(crate) fn enter(&self) -> Option<GateGuard<'_>> {
        let mut busy = self.busy.lock();
        if *busy {
            return None;
        }
        *busy = true;
        Some(GateGuard { gate: self })
    }

    pub(crate) fn is_busy(&self) -> bool {
        *self.busy.lock()
    }

    pub(crate) fn wait_idle(&self) {
        let mut busy = self.busy.lock();
        while *busy {
            self.idle.wait(&mut busy);
        }
    }

    /// Returns `false` if a drain was still running when `timeout` elapsed.
    pub(crate) fn wait_idle_for(&self, timeout: Duration) -> bool {
        let mut busy = self.busy.lock();
        if *busy {
            self.idle.wait_while_for(&mut busy, |busy| *busy, timeout);
        }
        !*busy
    }
}

pub(crate) struct GateGuard<'a> {
    gate: &'a ProcessingGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        *self.gate.busy.lock() = false;
        self.gate.idle.notify_all();
    }
}

/// Cross-thread handle used by the owner to shut recording down.
///
/// Obtained from [`RecordingManager::teardown_handle`](crate::RecordingManager::teardown_handle)
/// so teardown can be coordinated while the manager lives on a worker thread.
#[derive(Clone)]
pub struct TeardownHandle {
    pub(crate) shared: Arc<RecordingShared>,
}

impl TeardownHandle {
    /// Reject further pushes. Events already queued are released, not handled,
    /// by the next drain.
    pub fn request_shutdown(&self) {
        self.shared.freeing.set(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.freeing.get()
    }

    /// Whether a drain is in flight right now.
    pub fn is_processing(&self) -> bool {
        self.shared.gate.is_busy()
    }

    /// Block until no drain is in flight.
    pub fn wait_idle(&self) {
        self.shared.gate.wait_idle();
    }

    pub fn wait_idle_for(&self, timeout: Duration) -> bool {
        self.shared.gate.wait_idle_for(timeout)
    }
}

impl std::fmt::Debug for TeardownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeardownHandle")
            .field("shutting_down", &self.is_shutting_down())
            .field("processing", &self.is_processing())
            .finish()
    }
}
