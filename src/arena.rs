//! Arena: a chunked bump allocator that reclaims memory only in bulk.
//!
//! Allocations are carved linearly out of chunks. When no chunk has room a
//! new one of `max(request, chunk_size)` bytes is added. Individual blocks
//! are never freed: `reset` rewinds every chunk to empty and dropping the
//! arena frees all chunks at once.
//!
//! The chunk chain is searched newest first, so the most recently added
//! chunk serves requests before older ones with leftover space.
//!
//! `reset` takes `&mut self`. Anything still holding a `&Arena` (such as a
//! `Hashtable<_, _, _, &Arena>`) therefore has to be gone before a reset or
//! drop compiles.

use crate::allocator::Allocator;
use crate::error::AllocError;
use core::alloc::Layout;
use core::cell::RefCell;
use core::ptr::NonNull;

/// Chunk size used by `Arena::default_sized`.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Minimum alignment of every chunk buffer.
const CHUNK_ALIGN: usize = 16;

struct Chunk {
    data: NonNull<u8>,
    layout: Layout,
    used: usize,
}

impl Chunk {
    fn new(capacity: usize, align: usize) -> Result<Self, AllocError> {
        let layout = Layout::from_size_align(capacity, align.max(CHUNK_ALIGN))
            .map_err(|_| AllocError::CapacityOverflow)?;
        // SAFETY: callers never pass a zero capacity.
        let raw = unsafe { std::alloc::alloc(layout) };
        let data = NonNull::new(raw).ok_or_else(|| AllocError::out_of_memory(layout))?;
        Ok(Self {
            data,
            layout,
            used: 0,
        })
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// Bump `used` past an aligned block for `layout`, or `None` if the
    /// block does not fit in what is left.
    fn bump(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        let base = self.data.as_ptr() as usize;
        let align = layout.align();
        let start = base.checked_add(self.used)?.checked_add(align - 1)? & !(align - 1);
        let offset = start - base;
        let end = offset.checked_add(layout.size())?;
        if end > self.capacity() {
            return None;
        }
        self.used = end;
        // SAFETY: offset + size <= capacity, so the pointer stays in the buffer.
        Some(unsafe { NonNull::new_unchecked(self.data.as_ptr().add(offset)) })
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // SAFETY: data was allocated in `Chunk::new` with this layout.
        unsafe { std::alloc::dealloc(self.data.as_ptr(), self.layout) }
    }
}

/// Bump allocator over a chain of owned chunks; memory is reclaimed only by
/// `reset` or drop.
pub struct Arena {
    chunk_size: usize,
    // Oldest chunk first; searched from the back.
    chunks: RefCell<Vec<Chunk>>,
}

impl Arena {
    /// Create an arena whose first chunk holds `chunk_size` bytes.
    pub fn new(chunk_size: usize) -> Result<Self, AllocError> {
        if chunk_size == 0 {
            return Err(AllocError::ZeroSized);
        }
        let first = Chunk::new(chunk_size, CHUNK_ALIGN)?;
        Ok(Self {
            chunk_size,
            chunks: RefCell::new(vec![first]),
        })
    }

    /// Create an arena with `DEFAULT_CHUNK_SIZE` chunks.
    pub fn default_sized() -> Result<Self, AllocError> {
        Self::new(DEFAULT_CHUNK_SIZE)
    }

    /// Allocate `size` bytes with no alignment requirement.
    pub fn alloc(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let layout = Layout::from_size_align(size, 1).map_err(|_| AllocError::CapacityOverflow)?;
        self.alloc_layout(layout)
    }

    /// Allocate a block for `layout` from the newest chunk that has room,
    /// adding a chunk if none does.
    pub fn alloc_layout(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError::ZeroSized);
        }
        let mut chunks = self.chunks.borrow_mut();
        if let Some(ptr) = chunks.iter_mut().rev().find_map(|c| c.bump(layout)) {
            return Ok(ptr);
        }

        let capacity = layout.size().max(self.chunk_size);
        let mut chunk = match Chunk::new(capacity, layout.align()) {
            Ok(c) => c,
            Err(e) => {
                #[cfg(feature = "logging")]
                log::warn!("arena: failed to add a {capacity}-byte chunk: {e}");
                return Err(e);
            }
        };
        #[cfg(feature = "logging")]
        log::debug!(
            "arena: added chunk #{} of {capacity} bytes for a {}-byte request",
            chunks.len() + 1,
            layout.size()
        );
        let ptr = chunk.bump(layout).ok_or(AllocError::CapacityOverflow)?;
        chunks.push(chunk);
        Ok(ptr)
    }

    /// Mark every chunk empty. Chunks are kept and their bytes are left as
    /// they were; earlier allocations must not be used after this.
    pub fn reset(&mut self) {
        let chunks = self.chunks.get_mut();
        for chunk in chunks.iter_mut() {
            chunk.used = 0;
        }
        #[cfg(feature = "logging")]
        log::trace!("arena: reset {} chunks", chunks.len());
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.borrow().len()
    }

    /// Capacities of all chunks, newest first.
    pub fn chunk_capacities(&self) -> Vec<usize> {
        self.chunks.borrow().iter().rev().map(Chunk::capacity).collect()
    }

    /// Bytes handed out (including alignment padding) since the last reset.
    pub fn used_bytes(&self) -> usize {
        self.chunks.borrow().iter().map(|c| c.used).sum()
    }

    /// Total bytes owned across all chunks.
    pub fn capacity_bytes(&self) -> usize {
        self.chunks.borrow().iter().map(Chunk::capacity).sum()
    }
}

impl Allocator for Arena {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.alloc_layout(layout)
    }

    /// No-op: arena memory comes back only through `reset` or drop.
    #[inline]
    unsafe fn release(&self, _ptr: NonNull<u8>, _layout: Layout) {}
}

impl core::fmt::Debug for Arena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arena")
            .field("chunk_size", &self.chunk_size)
            .field("chunks", &self.chunk_count())
            .field("used_bytes", &self.used_bytes())
            .field("capacity_bytes", &self.capacity_bytes())
            .finish()
    }
}
