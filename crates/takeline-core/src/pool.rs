//! Fixed-capacity object pool with generation-checked handles.
//!
//! Slots are preallocated at construction. The free list is an
//! [`MpmcQueue`] of slot indices, so `acquire` (audio thread) and `release`
//! (consumer thread) can run concurrently without locks or allocation.

use crate::queue::MpmcQueue;
use crate::{Error, Result};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Unique identifier for a pool instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PoolId(u32);

impl PoolId {
    fn generate() -> Self {
        static COUNTER: AtomicU32 = AtomicU32::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Exclusive handle to an acquired pool slot.
///
/// Not `Clone`: holding the handle is what grants access to the slot. It is
/// consumed by [`ObjectPool::release`].
#[derive(Debug, PartialEq, Eq)]
pub struct PoolHandle {
    pool: PoolId,
    index: u32,
    generation: u32,
}

impl PoolHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

struct PoolSlot<T> {
    value: UnsafeCell<T>,
    generation: AtomicU32,
    in_use: AtomicBool,
}

/// Preallocated pool of `T`.
pub struct ObjectPool<T> {
    id: PoolId,
    slots: Box<[PoolSlot<T>]>,
    free: MpmcQueue<u32>,
}

// SAFETY: a slot's value is only reachable through its unique `PoolHandle`,
// which moves between threads together with the data it guards.
unsafe impl<T: Send> Send for ObjectPool<T> {}
// SAFETY: see above.
unsafe impl<T: Send> Sync for ObjectPool<T> {}

impl<T> ObjectPool<T> {
    /// Build a pool of `capacity` objects, each created by `factory`.
    ///
    /// All allocation happens here; the pool never grows afterwards.
    pub fn new(capacity: usize, mut factory: impl FnMut() -> T) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(
                "pool capacity must be non-zero".into(),
            ));
        }
        if capacity > u32::MAX as usize {
            return Err(Error::InvalidCapacity(format!(
                "pool capacity {} exceeds u32 range",
                capacity
            )));
        }

        let free = MpmcQueue::with_capacity(capacity)?;
        let slots = (0..capacity)
            .map(|_| PoolSlot {
                value: UnsafeCell::new(factory()),
                generation: AtomicU32::new(0),
                in_use: AtomicBool::new(false),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        for index in 0..capacity as u32 {
            free.try_push(index)
                .map_err(|index| Error::FreeListOverflow(index as usize))?;
        }

        Ok(Self {
            id: PoolId::generate(),
            slots,
            free,
        })
    }

    /// Take a free slot. Returns `None` when the pool is exhausted.
    ///
    /// Never blocks and never allocates.
    #[inline]
    pub fn acquire(&self) -> Option<PoolHandle> {
        let index = self.free.try_pop()?;
        let slot = &self.slots[index as usize];
        slot.in_use.store(true, Ordering::Release);
        Some(PoolHandle {
            pool: self.id,
            index,
            generation: slot.generation.load(Ordering::Acquire),
        })
    }

    /// Shared access to the object behind `handle`.
    #[inline]
    pub fn get(&self, handle: &PoolHandle) -> Option<&T> {
        let slot = self.validate(handle)?;
        // SAFETY: `handle` is the only live handle for this slot and we hold a
        // shared borrow of it, so no `&mut T` can exist concurrently.
        Some(unsafe { &*slot.value.get() })
    }

    /// Exclusive access to the object behind `handle`.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub fn get_mut(&self, handle: &mut PoolHandle) -> Option<&mut T> {
        let slot = self.validate(handle)?;
        // SAFETY: the mutable borrow of the unique handle guarantees no other
        // reference to this slot's value is alive.
        Some(unsafe { &mut *slot.value.get() })
    }

    /// Return a slot to the free list.
    ///
    /// Fails with [`Error::StaleHandle`] for handles from another pool, from a
    /// previous generation of the slot, or for slots already released.
    pub fn release(&self, handle: PoolHandle) -> Result<()> {
        let stale = || Error::StaleHandle {
            index: handle.index as usize,
            generation: handle.generation,
        };

        let slot = self.validate(&handle).ok_or_else(stale)?;
        if !slot.in_use.swap(false, Ordering::AcqRel) {
            return Err(stale());
        }
        slot.generation.fetch_add(1, Ordering::AcqRel);

        self.free
            .try_push(handle.index)
            .map_err(|index| Error::FreeListOverflow(index as usize))
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slots currently available to `acquire`.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn in_use_count(&self) -> usize {
        self.capacity() - self.free_count()
    }

    #[inline]
    fn validate(&self, handle: &PoolHandle) -> Option<&PoolSlot<T>> {
        if handle.pool != self.id {
            return None;
        }
        let slot = self.slots.get(handle.index as usize)?;
        let live = slot.in_use.load(Ordering::Acquire)
            && slot.generation.load(Ordering::Acquire) == handle.generation;
        live.then_some(slot)
    }

    #[cfg(test)]
    fn forge_handle(&self, index: u32, generation: u32) -> PoolHandle {
        PoolHandle {
            pool: self.id,
            index,
            generation,
        }
    }
}

impl<T> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("capacity", &self.capacity())
            .field("free", &self.free_count())
            .finish()
    }
}
