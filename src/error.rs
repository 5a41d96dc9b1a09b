//! Allocation errors shared by the allocators and the hashtable.

use core::alloc::Layout;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The backing store could not satisfy the request.
    #[error("out of memory allocating {size} bytes (align {align})")]
    OutOfMemory { size: usize, align: usize },

    /// A zero-byte block was requested; allocators never hand these out.
    #[error("zero-sized allocation requested")]
    ZeroSized,

    /// Size arithmetic overflowed `isize::MAX`.
    #[error("capacity overflow")]
    CapacityOverflow,
}

impl AllocError {
    pub(crate) fn out_of_memory(layout: Layout) -> Self {
        AllocError::OutOfMemory {
            size: layout.size(),
            align: layout.align(),
        }
    }
}
