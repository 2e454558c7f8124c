use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{Block, BlockAllocator, Result};

/// A [`BlockAllocator`] that forwards every request to the system allocator.
///
/// This is the default allocator of [`BlockList`][crate::BlockList]. It keeps no state: each
/// call to [`allocate()`][BlockAllocator::allocate] is one system allocation and each
/// [`deallocate()`][BlockAllocator::deallocate] releases the memory immediately.
///
/// All system allocators compare equal, whatever their element type.
///
/// # Example
///
/// ```
/// use block_pool::{BlockAllocator, SystemAllocator};
///
/// let mut allocator = SystemAllocator::<u8>::new();
///
/// let block = allocator.allocate(64)?;
/// assert_eq!(block.count(), 64);
///
/// allocator.deallocate(block);
///
/// assert!(allocator == SystemAllocator::<u64>::new());
/// # Ok::<(), block_pool::Error>(())
/// ```
pub struct SystemAllocator<T> {
    _element: PhantomData<fn() -> T>,
}

impl<T> SystemAllocator<T> {
    /// Creates a new system allocator.
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self {
            _element: PhantomData,
        }
    }
}

impl<T> BlockAllocator<T> for SystemAllocator<T> {
    #[inline]
    fn allocate(&mut self, count: usize) -> Result<Block<T>> {
        Block::allocate(count)
    }

    #[inline]
    fn deallocate(&mut self, block: Block<T>) {
        drop(block);
    }
}

impl<T> Default for SystemAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SystemAllocator<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SystemAllocator<T> {}

impl<T, U> PartialEq<SystemAllocator<U>> for SystemAllocator<T> {
    #[inline]
    fn eq(&self, _other: &SystemAllocator<U>) -> bool {
        true
    }
}

impl<T> Eq for SystemAllocator<T> {}

impl<T> fmt::Debug for SystemAllocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemAllocator")
            .field("element_type", &format_args!("{}", type_name::<T>()))
            .finish()
    }
}
