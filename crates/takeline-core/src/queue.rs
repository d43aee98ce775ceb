//! Bounded lock-free MPMC queue.
//!
//! Thin wrapper over [`crossbeam::queue::ArrayQueue`] that reports a zero
//! capacity as a construction error and hands the item back when full.
//! Neither side ever waits on the other.

use crate::{Error, Result};
use crossbeam::queue::ArrayQueue;

/// Fixed-capacity, allocation-free (after construction) MPMC FIFO.
///
/// Items pushed by the same producer are popped in push order. No ordering
/// is promised between different producers.
pub struct MpmcQueue<T> {
    inner: ArrayQueue<T>,
}

impl<T> MpmcQueue<T> {
    /// Create a queue holding exactly `capacity` items.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(
                "queue capacity must be non-zero".into(),
            ));
        }
        Ok(Self {
            inner: ArrayQueue::new(capacity),
        })
    }

    /// Push without blocking. Returns the item back if the queue is full.
    #[inline]
    pub fn try_push(&self, item: T) -> core::result::Result<(), T> {
        self.inner.push(item)
    }

    /// Pop without blocking. Returns `None` if the queue is empty.
    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        self.inner.pop()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Approximate number of queued items. Exact when no push or pop is in flight.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }
}

impl<T> std::fmt::Debug for MpmcQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpmcQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            MpmcQueue::<u32>::with_capacity(0),
            Err(Error::InvalidCapacity(_))
        ));
    }

    #[test]
    fn test_capacity_is_exact() {
        let queue = MpmcQueue::<u32>::with_capacity(400).unwrap();
        assert_eq!(queue.capacity(), 400);
        for i in 0..400 {
            queue.try_push(i).unwrap();
        }
        assert!(queue.is_full());
        assert_eq!(queue.try_push(400), Err(400));
    }

    #[test]
    fn test_fifo_single_thread() {
        let queue = MpmcQueue::with_capacity(8).unwrap();
        for i in 0..8 {
            assert!(queue.try_push(i).is_ok());
        }
        for i in 0..8 {
            assert_eq!(queue.try_pop(), Some(i));
        }
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_full_queue_returns_item_immediately() {
        let queue = MpmcQueue::with_capacity(4).unwrap();
        for i in 0..4 {
            queue.try_push(i).unwrap();
        }
        assert!(queue.is_full());

        let start = Instant::now();
        assert_eq!(queue.try_push(99), Err(99));
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn test_wraps_around_many_laps() {
        let queue = MpmcQueue::with_capacity(3).unwrap();
        for lap in 0..100u32 {
            queue.try_push(lap).unwrap();
            queue.try_push(lap + 1000).unwrap();
            assert_eq!(queue.try_pop(), Some(lap));
            assert_eq!(queue.try_pop(), Some(lap + 1000));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drop_releases_pending_items() {
        let marker = Arc::new(());
        {
            let queue = MpmcQueue::with_capacity(4).unwrap();
            queue.try_push(Arc::clone(&marker)).unwrap();
            queue.try_push(Arc::clone(&marker)).unwrap();
            assert_eq!(Arc::strong_count(&marker), 3);
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn test_per_producer_order_across_threads() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 5_000;

        let queue = Arc::new(MpmcQueue::with_capacity(256).unwrap());

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        let mut item = (producer, seq);
                        // Test-side retry only; real producers drop on full.
                        while let Err(back) = queue.try_push(item) {
                            item = back;
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        let mut next_expected = [0usize; PRODUCERS];
        let mut received = 0;
        while received < PRODUCERS * PER_PRODUCER {
            if let Some((producer, seq)) = queue.try_pop() {
                assert_eq!(seq, next_expected[producer]);
                next_expected[producer] += 1;
                received += 1;
            } else {
                thread::yield_now();
            }
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(queue.is_empty());
    }

    proptest! {
        #[test]
        fn prop_single_producer_preserves_order(
            items in prop::collection::vec(any::<u32>(), 0..200)
        ) {
            let queue = MpmcQueue::with_capacity(256).unwrap();
            for &item in &items {
                prop_assert!(queue.try_push(item).is_ok());
            }
            let popped: Vec<u32> = std::iter::from_fn(|| queue.try_pop()).collect();
            prop_assert_eq!(popped, items);
        }

        #[test]
        fn prop_interleaved_push_pop_is_fifo(ops in prop::collection::vec(any::<bool>(), 0..500)) {
            let queue = MpmcQueue::with_capacity(16).unwrap();
            let mut model = std::collections::VecDeque::new();
            let mut next = 0u32;
            for push in ops {
                if push {
                    match queue.try_push(next) {
                        Ok(()) => model.push_back(next),
                        Err(item) => {
                            prop_assert_eq!(item, next);
                            prop_assert_eq!(model.len(), queue.capacity());
                        }
                    }
                    next += 1;
                } else {
                    prop_assert_eq!(queue.try_pop(), model.pop_front());
                }
            }
        }
    }
}
