#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-size block pool allocator and a minimal owning container built on top of it.
//!
//! This crate provides:
//!
//! * [`BlockAllocator`] - the capability of handing out and reclaiming [`Block`]s of raw storage
//!   and of beginning and ending the lifetime of values in them.
//! * [`PoolAllocator`] - keeps a free list of single-element blocks, refilled from the system
//!   allocator in batches of `BATCH_SIZE` blocks. Requests for more than one element go
//!   straight to the system allocator.
//! * [`SystemAllocator`] - forwards every request to the system allocator.
//! * [`BlockList`] - an ordered collection that allocates, constructs and later destroys each
//!   element in its own block obtained from a pluggable allocator.
//!
//! Blocks and constructed [`Element`]s are move-only handles rather than raw pointers, so a
//! block cannot be released twice and an element cannot be used after it has been destroyed.
//!
//! # Example
//!
//! ```
//! use block_pool::{BlockAllocator, BlockList, PoolAllocator};
//!
//! // A pool that refills itself 10 blocks at a time.
//! let mut list = BlockList::<u64, _>::with_allocator(PoolAllocator::<u64, 10>::new());
//!
//! for i in 0..10 {
//!     list.push(i * i)?;
//! }
//!
//! assert_eq!(list.len(), 10);
//! assert_eq!(list.iter().last(), Some(&81));
//!
//! // The allocator can also be used directly.
//! let mut allocator = PoolAllocator::<String>::new();
//!
//! let block = allocator.allocate(1)?;
//! let element = allocator.construct(block, "pooled".to_string());
//! assert_eq!(&*element, "pooled");
//!
//! let block = allocator.destroy(element);
//! allocator.deallocate(block);
//! # Ok::<(), block_pool::Error>(())
//! ```
//!
//! # Thread safety
//!
//! Allocators and lists can be moved between threads when their element type allows it. All
//! mutation requires exclusive access, so there is no internal synchronization.

mod allocator;
mod block;
mod error;
mod list;
mod pool;
mod system;

pub use allocator::*;
pub use block::*;
pub use error::*;
pub use list::*;
pub use pool::*;
pub use system::*;
