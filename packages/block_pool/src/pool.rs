use std::any::type_name;
use std::fmt;

use tracing::{debug, trace};

use crate::block::out_of_memory;
use crate::{Block, BlockAllocator, Result};

/// Number of blocks a [`PoolAllocator`] obtains from the system allocator whenever it runs out
/// of free blocks, unless specified otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// A [`BlockAllocator`] that recycles single-element blocks through a free list.
///
/// Requests for exactly one element are served from the pool. When the pool is empty, it first
/// obtains `BATCH_SIZE` new single-element blocks from the system allocator, so the cost of
/// system allocation is amortized over `BATCH_SIZE` pool allocations. Released single-element
/// blocks go back to the pool and the most recently released block is handed out first.
///
/// Requests for more than one element bypass the pool entirely: they are satisfied and
/// released directly through the system allocator and never change the contents of the pool.
///
/// Free blocks are released to the system allocator when the pool is dropped.
///
/// # Interchangeability
///
/// Every block is an independent system allocation, so any pool with the same batch size can
/// accept blocks allocated by any other. Pool allocators therefore always compare equal to each
/// other, independent of element type and of what their pools contain.
///
/// # Example
///
/// ```
/// use block_pool::{BlockAllocator, PoolAllocator};
///
/// let mut allocator = PoolAllocator::<u64, 4>::new();
/// assert_eq!(allocator.available(), 0);
///
/// // The first allocation expands the pool by a whole batch.
/// let block = allocator.allocate(1)?;
/// assert_eq!(allocator.available(), 3);
///
/// // Released blocks return to the pool for reuse.
/// allocator.deallocate(block);
/// assert_eq!(allocator.available(), 4);
///
/// // Large requests go straight to the system allocator.
/// let bulk = allocator.allocate(100)?;
/// allocator.deallocate(bulk);
/// assert_eq!(allocator.available(), 4);
/// # Ok::<(), block_pool::Error>(())
/// ```
pub struct PoolAllocator<T, const BATCH_SIZE: usize = DEFAULT_BATCH_SIZE> {
    /// Vacant single-element blocks, used as a stack.
    free_blocks: Vec<Block<T>>,
}

impl<T, const BATCH_SIZE: usize> PoolAllocator<T, BATCH_SIZE> {
    /// Creates an allocator with an empty pool.
    ///
    /// No memory is allocated until the first request.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or `BATCH_SIZE` is zero.
    #[must_use]
    pub fn new() -> Self {
        assert!(
            size_of::<T>() > 0,
            "PoolAllocator must have non-zero element size"
        );
        assert!(BATCH_SIZE > 0, "PoolAllocator must have non-zero batch size");

        Self {
            free_blocks: Vec::new(),
        }
    }

    /// Creates an allocator for another element type with the same batch size.
    ///
    /// The new allocator has its own empty pool; no free blocks are shared with `self`. Blocks
    /// can still move between the two allocators via [`Block::try_cast()`], which checks that
    /// the element layouts match.
    ///
    /// # Panics
    ///
    /// Panics if `U` is zero-sized.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::PoolAllocator;
    ///
    /// let bytes = PoolAllocator::<[u8; 16], 32>::new();
    /// let pairs = bytes.rebind::<(u64, u64)>();
    ///
    /// assert_eq!(pairs.batch_size(), 32);
    /// assert!(bytes == pairs);
    /// ```
    #[must_use]
    pub fn rebind<U>(&self) -> PoolAllocator<U, BATCH_SIZE> {
        PoolAllocator::new()
    }

    /// The number of vacant blocks that can be handed out before the pool must expand.
    #[must_use]
    #[inline]
    pub fn available(&self) -> usize {
        self.free_blocks.len()
    }

    /// The number of blocks added to the pool on each expansion.
    #[must_use]
    #[inline]
    #[cfg_attr(test, mutants::skip)] // Trivial passthrough of a const parameter.
    pub const fn batch_size(&self) -> usize {
        BATCH_SIZE
    }

    /// Adds `BATCH_SIZE` fresh blocks to the pool.
    ///
    /// If the system allocator fails partway, the blocks obtained so far stay in the pool.
    /// Failing to grow the free list itself is reported as `OutOfMemory` for the whole batch.
    fn expand(&mut self) -> Result<()> {
        debug_assert!(self.free_blocks.is_empty());

        debug!(
            element_type = type_name::<T>(),
            batch_size = BATCH_SIZE,
            "expanding block pool"
        );

        self.free_blocks
            .try_reserve(BATCH_SIZE)
            .map_err(|_| out_of_memory::<T>(BATCH_SIZE))?;

        for _ in 0..BATCH_SIZE {
            self.free_blocks.push(Block::allocate(1)?);
        }

        Ok(())
    }
}

impl<T, const BATCH_SIZE: usize> BlockAllocator<T> for PoolAllocator<T, BATCH_SIZE> {
    fn allocate(&mut self, count: usize) -> Result<Block<T>> {
        assert!(
            count > 0,
            "cannot allocate storage for zero {} elements",
            type_name::<T>()
        );

        if count > 1 {
            trace!(
                element_type = type_name::<T>(),
                count, "allocating outside of block pool"
            );

            return Block::allocate(count);
        }

        if self.free_blocks.is_empty() {
            self.expand()?;
        }

        Ok(self
            .free_blocks
            .pop()
            .expect("pool was refilled above if it was empty"))
    }

    fn deallocate(&mut self, block: Block<T>) {
        if block.count() > 1 {
            trace!(
                element_type = type_name::<T>(),
                count = block.count(),
                "releasing block outside of block pool"
            );

            drop(block);
            return;
        }

        self.free_blocks.push(block);
    }
}

impl<T, const BATCH_SIZE: usize> Default for PoolAllocator<T, BATCH_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning an allocator yields a new allocator with an empty pool of its own.
impl<T, const BATCH_SIZE: usize> Clone for PoolAllocator<T, BATCH_SIZE> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T, U, const BATCH_SIZE: usize> PartialEq<PoolAllocator<U, BATCH_SIZE>>
    for PoolAllocator<T, BATCH_SIZE>
{
    #[inline]
    fn eq(&self, _other: &PoolAllocator<U, BATCH_SIZE>) -> bool {
        true
    }
}

impl<T, const BATCH_SIZE: usize> Eq for PoolAllocator<T, BATCH_SIZE> {}

impl<T, const BATCH_SIZE: usize> fmt::Debug for PoolAllocator<T, BATCH_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("element_type", &format_args!("{}", type_name::<T>()))
            .field("batch_size", &BATCH_SIZE)
            .field("available", &self.free_blocks.len())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(PoolAllocator<u32>: Send, Sync);
    assert_not_impl_any!(PoolAllocator<Rc<u32>>: Send, Sync);

    #[test]
    fn starts_empty() {
        let allocator = PoolAllocator::<u32>::new();

        assert_eq!(allocator.available(), 0);
        assert_eq!(allocator.batch_size(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn first_allocation_expands_by_batch() {
        let mut allocator = PoolAllocator::<u32, 5>::new();

        let block = allocator.allocate(1).unwrap();

        assert_eq!(block.count(), 1);
        assert_eq!(allocator.available(), 4);
    }

    #[test]
    fn pool_reuse_never_expands_again() {
        let mut allocator = PoolAllocator::<u64, 3>::new();

        let first = allocator.allocate(1).unwrap();
        let address = first.ptr();
        allocator.deallocate(first);
        assert_eq!(allocator.available(), 3);

        for _ in 0..1000 {
            let block = allocator.allocate(1).unwrap();

            // Most recently released block is handed out first.
            assert_eq!(block.ptr(), address);
            assert_eq!(allocator.available(), 2);

            allocator.deallocate(block);
            assert_eq!(allocator.available(), 3);
        }
    }

    #[test]
    fn batch_growth() {
        const BATCH: usize = 4;
        let mut allocator = PoolAllocator::<u32, BATCH>::new();

        let mut blocks = Vec::new();

        // Exhaust the first batch.
        for expected_available in (0..BATCH).rev() {
            blocks.push(allocator.allocate(1).unwrap());
            assert_eq!(allocator.available(), expected_available);
        }

        // The next one triggers exactly one expansion of exactly BATCH blocks.
        blocks.push(allocator.allocate(1).unwrap());
        assert_eq!(allocator.available(), BATCH - 1);

        // The following BATCH - 1 allocations are served without expansion.
        for expected_available in (0..BATCH - 1).rev() {
            blocks.push(allocator.allocate(1).unwrap());
            assert_eq!(allocator.available(), expected_available);
        }

        let distinct = blocks.iter().map(Block::ptr).collect::<HashSet<_>>();
        assert_eq!(distinct.len(), BATCH * 2);

        for block in blocks {
            allocator.deallocate(block);
        }

        assert_eq!(allocator.available(), BATCH * 2);
    }

    #[test]
    fn bypass_isolation() {
        let mut allocator = PoolAllocator::<u32, 4>::new();

        let pooled = allocator.allocate(1).unwrap();
        assert_eq!(allocator.available(), 3);

        let bulk = allocator.allocate(5).unwrap();
        assert_eq!(bulk.count(), 5);
        assert_eq!(allocator.available(), 3);

        allocator.deallocate(bulk);
        assert_eq!(allocator.available(), 3);

        allocator.deallocate(pooled);
        assert_eq!(allocator.available(), 4);
    }

    #[test]
    fn bypass_on_empty_pool_does_not_expand() {
        let mut allocator = PoolAllocator::<u32, 4>::new();

        let bulk = allocator.allocate(10).unwrap();
        allocator.deallocate(bulk);

        assert_eq!(allocator.available(), 0);
    }

    #[test]
    fn multi_element_within_batch_bypasses_pool() {
        let mut allocator = PoolAllocator::<u32, 8>::new();

        let small_bulk = allocator.allocate(3).unwrap();
        assert_eq!(small_bulk.count(), 3);
        assert_eq!(allocator.available(), 0);

        allocator.deallocate(small_bulk);
        assert_eq!(allocator.available(), 0);
    }

    #[test]
    fn bypass_out_of_memory_leaves_pool_untouched() {
        let mut allocator = PoolAllocator::<u64, 2>::new();

        let block = allocator.allocate(1).unwrap();
        allocator.deallocate(block);

        let result = allocator.allocate(usize::MAX);
        assert!(matches!(result, Err(crate::Error::OutOfMemory { .. })));
        assert_eq!(allocator.available(), 2);
    }

    #[test]
    fn expansion_out_of_memory_is_reported() {
        // The free list cannot even reserve room for a batch this large.
        const HUGE_BATCH: usize = 1 << 60;

        let mut allocator = PoolAllocator::<u64, HUGE_BATCH>::new();

        let result = allocator.allocate(1);

        assert!(matches!(
            result,
            Err(crate::Error::OutOfMemory {
                count: HUGE_BATCH,
                ..
            })
        ));
        assert_eq!(allocator.available(), 0);

        // Bulk requests do not depend on the free list and still succeed.
        let bulk = allocator.allocate(4).unwrap();
        allocator.deallocate(bulk);
        assert_eq!(allocator.available(), 0);
    }

    #[test]
    fn expansion_block_out_of_memory_is_reported() {
        let mut allocator = PoolAllocator::<[u8; 1 << 50], 2>::new();

        let result = allocator.allocate(1);

        assert!(matches!(result, Err(crate::Error::OutOfMemory { .. })));
        assert_eq!(allocator.available(), 0);
    }

    #[test]
    #[should_panic]
    fn zero_count_panics() {
        let mut allocator = PoolAllocator::<u32>::new();
        drop(allocator.allocate(0));
    }

    #[test]
    #[should_panic]
    fn zst_panics() {
        drop(PoolAllocator::<()>::new());
    }

    #[test]
    #[should_panic]
    fn zero_batch_size_panics() {
        drop(PoolAllocator::<u32, 0>::new());
    }

    #[test]
    fn construct_destroy_through_pool() {
        struct Logged(Rc<RefCell<Vec<&'static str>>>);

        impl Drop for Logged {
            fn drop(&mut self) {
                self.0.borrow_mut().push("dropped");
            }
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut allocator = PoolAllocator::<Logged, 2>::new();

        let block = allocator.allocate(1).unwrap();
        let element = allocator.construct(block, Logged(Rc::clone(&log)));
        assert!(log.borrow().is_empty());

        let block = allocator.destroy(element);
        assert_eq!(*log.borrow(), ["dropped"]);

        allocator.deallocate(block);
        assert_eq!(allocator.available(), 2);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn clone_has_independent_empty_pool() {
        let mut allocator = PoolAllocator::<u32, 4>::new();
        let block = allocator.allocate(1).unwrap();
        allocator.deallocate(block);

        let clone = allocator.clone();

        assert_eq!(allocator.available(), 4);
        assert_eq!(clone.available(), 0);
    }

    #[test]
    fn compatibility_ignores_pool_contents() {
        let mut full = PoolAllocator::<u32, 4>::new();
        let block = full.allocate(1).unwrap();
        full.deallocate(block);

        let empty = PoolAllocator::<u32, 4>::new();
        let other_type = PoolAllocator::<String, 4>::new();

        assert!(full == empty);
        assert!(empty == full);
        assert!(full == other_type);
        assert!(other_type == full);
    }

    #[test]
    fn blocks_move_between_equal_allocators() {
        let mut first = PoolAllocator::<u32, 2>::new();
        let mut second = PoolAllocator::<u32, 2>::new();

        let block = first.allocate(1).unwrap();
        second.deallocate(block);

        assert_eq!(first.available(), 1);
        assert_eq!(second.available(), 1);
    }

    #[test]
    fn rebind_gets_independent_pool() {
        let mut allocator = PoolAllocator::<u32, 4>::new();
        let block = allocator.allocate(1).unwrap();
        allocator.deallocate(block);

        let rebound = allocator.rebind::<f32>();

        assert_eq!(rebound.available(), 0);
        assert_eq!(rebound.batch_size(), 4);
        assert_eq!(allocator.available(), 4);
    }

    #[test]
    fn cast_block_into_rebound_pool() {
        let mut allocator = PoolAllocator::<u32, 4>::new();
        let mut rebound = allocator.rebind::<f32>();

        let block = allocator.allocate(1).unwrap();
        let block = block.try_cast::<f32>().unwrap();
        rebound.deallocate(block);

        let reused = rebound.allocate(1).unwrap();
        let element = rebound.construct(reused, 1.5);
        assert!((*element - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn debug_output() {
        let allocator = PoolAllocator::<u16, 7>::new();
        let debug = format!("{allocator:?}");

        assert!(debug.contains("u16"));
        assert!(debug.contains("batch_size: 7"));
        assert!(debug.contains("available: 0"));
    }
}
