use crate::{Block, Element, Result};

/// The capability a [`BlockList`][crate::BlockList] needs from its storage provider.
///
/// Memory management and object lifetime are separate steps:
///
/// * [`allocate()`][Self::allocate] and [`deallocate()`][Self::deallocate] deal in raw,
///   uninitialized [`Block`]s.
/// * [`construct()`][Self::construct] and [`destroy()`][Self::destroy] begin and end the
///   lifetime of a value inside a single-element block, turning it into an [`Element`] and back.
///
/// All handles are move-only, so releasing a block twice or touching an element after it has
/// been destroyed does not compile.
///
/// # Example
///
/// ```
/// use block_pool::{BlockAllocator, SystemAllocator};
///
/// let mut allocator = SystemAllocator::<String>::new();
///
/// let block = allocator.allocate(1)?;
/// let element = allocator.construct(block, "hello".to_string());
/// assert_eq!(&*element, "hello");
///
/// let block = allocator.destroy(element);
/// allocator.deallocate(block);
/// # Ok::<(), block_pool::Error>(())
/// ```
pub trait BlockAllocator<T> {
    /// Obtains uninitialized storage for `count` contiguous elements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`][crate::Error::OutOfMemory] if the system allocator
    /// cannot provide the memory.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    fn allocate(&mut self, count: usize) -> Result<Block<T>>;

    /// Releases a block obtained from [`allocate()`][Self::allocate] on this allocator or on
    /// any allocator that compares equal to it.
    fn deallocate(&mut self, block: Block<T>);

    /// Moves `value` into a single-element block. No memory is allocated.
    ///
    /// # Panics
    ///
    /// Panics if the block has room for more than one element.
    fn construct(&mut self, block: Block<T>, value: T) -> Element<T> {
        block.construct(value)
    }

    /// Drops the value of an element in place and returns its block. No memory is released.
    fn destroy(&mut self, element: Element<T>) -> Block<T> {
        element.destroy()
    }
}
