//! Lock-free building blocks for the real-time recording pipeline.
//!
//! # Primary API
//!
//! - [`MpmcQueue`]: bounded, allocation-free MPMC FIFO
//! - [`ObjectPool`] / [`PoolHandle`]: preallocated slots with generation checks
//! - [`AtomicFlag`], [`AtomicCounter`]: cache-line aligned atomics
//!
//! Every operation the audio thread may call (`try_push`, `try_pop`,
//! `acquire`, `release`, counter updates) is non-blocking and never touches
//! the allocator.
//!
//! # Example
//!
//! ```
//! use takeline_core::{MpmcQueue, ObjectPool};
//!
//! let pool = ObjectPool::new(8, || [0.0f32; 64]).unwrap();
//! let queue = MpmcQueue::with_capacity(8).unwrap();
//!
//! // audio thread
//! let mut handle = pool.acquire().expect("pool exhausted");
//! pool.get_mut(&mut handle).unwrap()[0] = 1.0;
//! assert!(queue.try_push(handle).is_ok());
//!
//! // consumer thread
//! let handle = queue.try_pop().unwrap();
//! assert_eq!(pool.get(&handle).unwrap()[0], 1.0);
//! pool.release(handle).unwrap();
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod lockfree;
pub use lockfree::{AtomicCounter, AtomicFlag};

pub mod pool;
pub use pool::{ObjectPool, PoolHandle};

pub mod queue;
pub use queue::MpmcQueue;
