use thiserror::Error;

/// Errors that can occur when obtaining memory for blocks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The system allocator could not provide memory for the requested number of elements,
    /// or the requested size does not fit in the address space.
    #[error("out of memory: cannot allocate storage for {count} x {element_type}")]
    OutOfMemory {
        /// Name of the element type the storage was requested for.
        element_type: &'static str,

        /// Number of contiguous elements requested.
        count: usize,
    },
}

/// A specialized `Result` type for block allocation, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
