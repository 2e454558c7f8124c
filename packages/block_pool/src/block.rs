use std::alloc::{Layout, alloc, dealloc};
use std::any::type_name;
use std::fmt;
use std::mem::{ManuallyDrop, MaybeUninit};
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

use tracing::debug;

use crate::{Error, Result};

/// Exclusive handle to uninitialized storage for `count()` contiguous elements of `T`.
///
/// Blocks are handed out by a [`BlockAllocator`][crate::BlockAllocator] and handed back to it
/// through [`deallocate()`][crate::BlockAllocator::deallocate]. A block cannot be copied or
/// cloned, so the type system guarantees that each block is released exactly once.
///
/// Every block is backed by its own system allocation. If a block is dropped instead of being
/// returned to an allocator, its memory goes straight back to the system allocator.
///
/// # Example
///
/// ```
/// use block_pool::{BlockAllocator, PoolAllocator};
///
/// let mut allocator = PoolAllocator::<u64>::new();
///
/// let mut block = allocator.allocate(1)?;
/// assert_eq!(block.count(), 1);
///
/// block.as_uninit_slice_mut()[0].write(42);
///
/// allocator.deallocate(block);
/// # Ok::<(), block_pool::Error>(())
/// ```
pub struct Block<T> {
    ptr: NonNull<T>,
    count: usize,
}

impl<T> Block<T> {
    /// Obtains storage for `count` elements directly from the system allocator.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero or `T` is zero-sized.
    pub(crate) fn allocate(count: usize) -> Result<Self> {
        assert!(
            count > 0,
            "cannot allocate a block of zero {} elements",
            type_name::<T>()
        );
        assert!(
            size_of::<T>() > 0,
            "cannot allocate blocks for zero-sized {}",
            type_name::<T>()
        );

        let Ok(layout) = Layout::array::<T>(count) else {
            debug!(
                element_type = type_name::<T>(),
                count, "requested block does not fit in the address space"
            );
            return Err(out_of_memory::<T>(count));
        };

        // SAFETY: The layout has a non-zero size because both `count` and the size of `T` are
        // non-zero, which is guarded by the assertions above.
        let ptr = unsafe { alloc(layout) }.cast::<T>();

        let Some(ptr) = NonNull::new(ptr) else {
            debug!(
                element_type = type_name::<T>(),
                count, "system allocator could not satisfy block request"
            );
            return Err(out_of_memory::<T>(count));
        };

        Ok(Self { ptr, count })
    }

    /// The number of contiguous elements this block has room for.
    ///
    /// Blocks served from a pool always have a count of one.
    #[must_use]
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns a pointer to the first element slot of the block.
    ///
    /// The memory behind the pointer is uninitialized unless the caller has written to it.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// Exposes the storage of the block as a slice of uninitialized slots.
    ///
    /// Values written through this slice are not dropped by the block. The caller owns them
    /// and must take them back out before the block is deallocated if they need dropping.
    #[must_use]
    pub fn as_uninit_slice_mut(&mut self) -> &mut [MaybeUninit<T>] {
        // SAFETY: The block exclusively owns `count` contiguous slots of `T` and `MaybeUninit`
        // places no initialization requirements on them.
        unsafe {
            slice::from_raw_parts_mut(self.ptr.as_ptr().cast::<MaybeUninit<T>>(), self.count)
        }
    }

    /// Reinterprets the block as storage for elements of type `U`.
    ///
    /// This only succeeds if `U` has the same size and alignment as `T`, in which case the
    /// resulting block can be handed to any allocator of `U`. Otherwise the original block is
    /// returned in the `Err` variant.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::{BlockAllocator, PoolAllocator};
    ///
    /// let mut unsigned = PoolAllocator::<u32>::new();
    /// let mut signed = unsigned.rebind::<i32>();
    ///
    /// let block = unsigned.allocate(1)?;
    /// let block = block.try_cast::<i32>().expect("u32 and i32 have the same layout");
    ///
    /// signed.deallocate(block);
    /// assert_eq!(signed.available(), 1);
    /// # Ok::<(), block_pool::Error>(())
    /// ```
    pub fn try_cast<U>(self) -> std::result::Result<Block<U>, Self> {
        if size_of::<T>() != size_of::<U>() || align_of::<T>() != align_of::<U>() {
            return Err(self);
        }

        let block = ManuallyDrop::new(self);

        Ok(Block {
            ptr: block.ptr.cast::<U>(),
            count: block.count,
        })
    }

    /// Moves `value` into the block, turning it into a constructed element.
    ///
    /// # Panics
    ///
    /// Panics if the block has room for more than one element.
    pub(crate) fn construct(self, value: T) -> Element<T> {
        assert!(
            self.count == 1,
            "cannot construct a single {} into a block of {} elements",
            type_name::<T>(),
            self.count
        );

        // SAFETY: The block is valid for writes of one `T` and holds no value that would need
        // to be dropped first.
        unsafe {
            self.ptr.write(value);
        }

        Element { block: self }
    }

    fn layout(&self) -> Layout {
        Layout::array::<T>(self.count)
            .expect("layout was already calculated once when allocating")
    }
}

impl<T> Drop for Block<T> {
    fn drop(&mut self) {
        // SAFETY: The pointer came from `alloc()` with this exact layout and the block is the
        // only owner of the allocation, so it is released exactly once.
        unsafe {
            dealloc(self.ptr.as_ptr().cast(), self.layout());
        }
    }
}

impl<T> fmt::Debug for Block<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("element_type", &format_args!("{}", type_name::<T>()))
            .field("count", &self.count)
            .field("ptr", &self.ptr)
            .finish()
    }
}

// SAFETY: The block is a uniquely owned allocation, nothing about it is tied to a thread.
unsafe impl<T: Send> Send for Block<T> {}

// SAFETY: Shared access only exposes the pointer value and count, never the contents.
unsafe impl<T: Sync> Sync for Block<T> {}

/// A single constructed value living in its own [`Block`].
///
/// Elements are produced by [`BlockAllocator::construct()`][crate::BlockAllocator::construct]
/// and turned back into blocks by [`BlockAllocator::destroy()`][crate::BlockAllocator::destroy].
/// The value never moves while the element exists, so [`ptr()`][Self::ptr] stays valid until
/// the element is destroyed.
///
/// Dropping an element drops the value and releases the block to the system allocator.
pub struct Element<T> {
    block: Block<T>,
}

impl<T> Element<T> {
    /// Returns a pointer to the value.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.block.ptr
    }

    /// Drops the value in place and returns the now vacant block.
    ///
    /// If the value panics while being dropped, the block memory is still released.
    pub(crate) fn destroy(self) -> Block<T> {
        let element = ManuallyDrop::new(self);

        // SAFETY: `element` is never used or dropped again, so the block is moved out of it
        // exactly once.
        let block = unsafe { ptr::read(&element.block) };

        // SAFETY: The block holds a constructed `T` that nothing else references. After this
        // the block is vacant again. On unwind, `block` goes out of scope and frees the memory.
        unsafe {
            ptr::drop_in_place(block.ptr.as_ptr());
        }

        block
    }
}

impl<T> Deref for Element<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: The element always holds a constructed value and we hand out references
        // bounded by the borrow of the element.
        unsafe { self.block.ptr.as_ref() }
    }
}

impl<T> DerefMut for Element<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: The element always holds a constructed value and we have exclusive access.
        unsafe { self.block.ptr.as_mut() }
    }
}

impl<T> Drop for Element<T> {
    fn drop(&mut self) {
        // SAFETY: The element always holds a constructed value, dropped exactly once here.
        // The `block` field is dropped afterwards, even on unwind, releasing the memory.
        unsafe {
            ptr::drop_in_place(self.block.ptr.as_ptr());
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Element<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Element").field(&**self).finish()
    }
}

// SAFETY: The element owns its value, so it can move between threads if the value can.
unsafe impl<T: Send> Send for Element<T> {}

// SAFETY: Shared access to the element only grants shared access to the value.
unsafe impl<T: Sync> Sync for Element<T> {}

pub(crate) fn out_of_memory<T>(count: usize) -> Error {
    Error::OutOfMemory {
        element_type: type_name::<T>(),
        count,
    }
}
