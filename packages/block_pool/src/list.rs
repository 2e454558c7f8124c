use std::any::type_name;
use std::fmt;
use std::iter::FusedIterator;
use std::slice;

use tracing::trace;

use crate::{BlockAllocator, Element, Result, SystemAllocator};

/// An ordered, growable collection that stores each element in its own block.
///
/// Unlike `Vec`, there is no contiguous backing buffer. Every [`push()`][Self::push] obtains
/// one single-element block from the allocator and constructs the value into it. Existing
/// elements are never moved or reallocated when the list grows, so their addresses stay stable
/// for as long as they are in the list.
///
/// When the list is dropped, every element is destroyed and its block handed back to the same
/// allocator that provided it.
///
/// # Example
///
/// ```
/// use block_pool::{BlockList, PoolAllocator};
///
/// let mut list = BlockList::<u32, _>::with_allocator(PoolAllocator::<u32, 10>::new());
///
/// for i in 0..10 {
///     list.push(i)?;
/// }
///
/// assert_eq!(list.len(), 10);
/// assert_eq!(list.to_string(), "0 1 2 3 4 5 6 7 8 9");
///
/// // Ten pushes consumed exactly one batch of ten blocks.
/// assert_eq!(list.allocator().available(), 0);
/// # Ok::<(), block_pool::Error>(())
/// ```
pub struct BlockList<T, A = SystemAllocator<T>>
where
    A: BlockAllocator<T>,
{
    allocator: A,

    /// One element per item, in insertion order.
    elements: Vec<Element<T>>,
}

impl<T, A> BlockList<T, A>
where
    A: BlockAllocator<T> + Default,
{
    /// Creates an empty list with a default-constructed allocator.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::BlockList;
    ///
    /// let list = BlockList::<String>::new();
    ///
    /// assert!(list.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_allocator(A::default())
    }
}

impl<T, A> BlockList<T, A>
where
    A: BlockAllocator<T>,
{
    /// Creates an empty list that obtains its storage from `allocator`.
    #[must_use]
    pub fn with_allocator(allocator: A) -> Self {
        Self {
            allocator,
            elements: Vec::new(),
        }
    }

    /// Appends a value to the end of the list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`][crate::Error::OutOfMemory] if the allocator cannot
    /// provide a block. The list is left unchanged in that case.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::BlockList;
    ///
    /// let mut list = BlockList::<&str>::new();
    /// list.push("first")?;
    /// list.push("second")?;
    ///
    /// assert_eq!(list.get(1), Some(&"second"));
    /// # Ok::<(), block_pool::Error>(())
    /// ```
    pub fn push(&mut self, value: T) -> Result<()> {
        let block = self.allocator.allocate(1)?;
        let element = self.allocator.construct(block, value);

        self.elements.push(element);

        Ok(())
    }

    /// The number of elements in the list.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the list has no elements.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the element at `index`, or `None` if the index is out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.elements.get(index).map(|element| &**element)
    }

    /// Iterates over the elements in insertion order.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::BlockList;
    ///
    /// let mut list = BlockList::<u8>::new();
    /// list.push(3)?;
    /// list.push(1)?;
    /// list.push(2)?;
    ///
    /// assert_eq!(list.iter().copied().collect::<Vec<_>>(), [3, 1, 2]);
    /// # Ok::<(), block_pool::Error>(())
    /// ```
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.elements.iter(),
        }
    }

    /// The allocator that provides storage for this list.
    #[must_use]
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }
}

impl<T, A> Default for BlockList<T, A>
where
    A: BlockAllocator<T> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A> Drop for BlockList<T, A>
where
    A: BlockAllocator<T>,
{
    fn drop(&mut self) {
        trace!(
            element_type = type_name::<T>(),
            count = self.elements.len(),
            "tearing down block list"
        );

        // If an element panics while being destroyed, the drain iterator drops the rest on
        // unwind. Those go straight back to the system allocator instead of to our allocator.
        for element in self.elements.drain(..) {
            let block = self.allocator.destroy(element);
            self.allocator.deallocate(block);
        }
    }
}

impl<'a, T, A> IntoIterator for &'a BlockList<T, A>
where
    A: BlockAllocator<T>,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Writes the elements separated by single spaces.
impl<T, A> fmt::Display for BlockList<T, A>
where
    T: fmt::Display,
    A: BlockAllocator<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, value) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }

            write!(f, "{value}")?;
        }

        Ok(())
    }
}

impl<T, A> fmt::Debug for BlockList<T, A>
where
    T: fmt::Debug,
    A: BlockAllocator<T> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockList")
            .field("allocator", &self.allocator)
            .field("elements", &DebugElements(self))
            .finish()
    }
}

struct DebugElements<'a, T, A>(&'a BlockList<T, A>)
where
    A: BlockAllocator<T>;

impl<T, A> fmt::Debug for DebugElements<'_, T, A>
where
    T: fmt::Debug,
    A: BlockAllocator<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Iterator over the elements of a [`BlockList`], in insertion order.
///
/// Returned by [`BlockList::iter()`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    inner: slice::Iter<'a, Element<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|element| &**element)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|element| &**element)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
