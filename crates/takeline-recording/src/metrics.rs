//! Drop and discard counters for the recording pipeline.
//!
//! Producers bump counters from the audio thread; the consumer reads them to
//! warn after a pass that lost events.

use takeline_core::AtomicCounter;

#[derive(Debug, Default)]
pub struct RecordingMetrics {
    pub(crate) pushed: AtomicCounter,
    /// No free event in the pool.
    pub(crate) pool_exhausted: AtomicCounter,
    /// Queue full; the event went back to the pool.
    pub(crate) queue_full: AtomicCounter,
    /// Invalid arguments, full producer tables, or pushes during teardown.
    pub(crate) rejected: AtomicCounter,
    pub(crate) processed: AtomicCounter,
    /// Events for tracks the project model does not know.
    pub(crate) unresolved: AtomicCounter,
    pub(crate) malformed: AtomicCounter,
    pub(crate) gaps: AtomicCounter,
    /// Model or undo failures while handling an event.
    pub(crate) failed: AtomicCounter,
    pub(crate) released_on_teardown: AtomicCounter,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events lost on the audio thread.
    pub fn dropped(&self) -> u64 {
        self.pool_exhausted.get() + self.queue_full.get() + self.rejected.get()
    }

    /// Events received by the consumer but not applied.
    pub fn discarded(&self) -> u64 {
        self.unresolved.get() + self.malformed.get() + self.gaps.get() + self.failed.get()
    }

    pub fn snapshot(&self) -> RecordingMetricsSnapshot {
        RecordingMetricsSnapshot {
            pushed: self.pushed.get(),
            pool_exhausted: self.pool_exhausted.get(),
            queue_full: self.queue_full.get(),
            rejected: self.rejected.get(),
            processed: self.processed.get(),
            unresolved: self.unresolved.get(),
            malformed: self.malformed.get(),
            gaps: self.gaps.get(),
            failed: self.failed.get(),
            released_on_teardown: self.released_on_teardown.get(),
        }
    }

    pub fn reset(&self) {
        self.pushed.take();
        self.pool_exhausted.take();
        self.queue_full.take();
        self.rejected.take();
        self.processed.take();
        self.unresolved.take();
        self.malformed.take();
        self.gaps.take();
        self.failed.take();
        self.released_on_teardown.take();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordingMetricsSnapshot {
    pub pushed: u64,
    pub pool_exhausted: u64,
    pub queue_full: u64,
    pub rejected: u64,
    pub processed: u64,
    pub unresolved: u64,
    pub malformed: u64,
    pub gaps: u64,
    pub failed: u64,
    pub released_on_teardown: u64,
}

impl RecordingMetricsSnapshot {
    pub fn dropped(&self) -> u64 {
        self.pool_exhausted + self.queue_full + self.rejected
    }

    pub fn discarded(&self) -> u64 {
        self.unresolved + self.malformed + self.gaps + self.failed
    }
}
