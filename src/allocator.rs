//! Allocator capability: where a table's slot array and entry blocks live.

use crate::error::AllocError;
use core::alloc::Layout;
use core::ptr::NonNull;

/// A source of raw memory blocks.
///
/// Implementations hand out blocks that satisfy the requested layout and
/// take them back through `release`. Releasing may be a no-op: `Arena`
/// reclaims memory only in bulk, so code written against this trait must
/// not assume `release` makes memory reusable.
pub trait Allocator {
    /// Allocate a block for `layout`. Zero-sized layouts are rejected with
    /// `AllocError::ZeroSized`.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Give a block back.
    ///
    /// # Safety
    /// `ptr` must have been returned by `allocate` on this allocator with the
    /// same `layout`, and must not have been released already.
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout);
}

impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).release(ptr, layout)
    }
}

/// The global heap (`std::alloc`). Release frees for real.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HeapAllocator;

impl Allocator for HeapAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError::ZeroSized);
        }
        // SAFETY: layout has a non-zero size.
        let raw = unsafe { std::alloc::alloc(layout) };
        NonNull::new(raw).ok_or_else(|| AllocError::out_of_memory(layout))
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout)
    }
}

// Typed helpers used by the hashtable. Zero-sized types never reach the
// allocator; they live at a dangling, well-aligned address.

/// Allocate a block for one `T` and move `value` into it.
pub(crate) fn alloc_value<T, A>(alloc: &A, value: T) -> Result<NonNull<T>, AllocError>
where
    A: Allocator + ?Sized,
{
    let layout = Layout::new::<T>();
    let ptr = if layout.size() == 0 {
        NonNull::dangling()
    } else {
        alloc.allocate(layout)?.cast::<T>()
    };
    // SAFETY: ptr is valid for writes of T and properly aligned.
    unsafe { ptr.as_ptr().write(value) };
    Ok(ptr)
}

/// Move the value out of its block and release the block.
///
/// # Safety
/// `ptr` must come from `alloc_value` on `alloc`, hold an initialized `T`,
/// and not be used afterwards.
pub(crate) unsafe fn take_value<T, A>(alloc: &A, ptr: NonNull<T>) -> T
where
    A: Allocator + ?Sized,
{
    let value = ptr.as_ptr().read();
    let layout = Layout::new::<T>();
    if layout.size() != 0 {
        alloc.release(ptr.cast(), layout);
    }
    value
}

/// Drop the value in place and release its block.
///
/// # Safety
/// Same contract as `take_value`.
pub(crate) unsafe fn drop_value<T, A>(alloc: &A, ptr: NonNull<T>)
where
    A: Allocator + ?Sized,
{
    drop(take_value(alloc, ptr));
}

/// Allocate an uninitialized array of `len` elements. `len` must be non-zero
/// and `T` must not be zero-sized.
pub(crate) fn alloc_array<T, A>(alloc: &A, len: usize) -> Result<NonNull<T>, AllocError>
where
    A: Allocator + ?Sized,
{
    let layout = Layout::array::<T>(len).map_err(|_| AllocError::CapacityOverflow)?;
    Ok(alloc.allocate(layout)?.cast::<T>())
}

/// Release an array obtained from `alloc_array`. Elements are not dropped.
///
/// # Safety
/// `ptr` and `len` must match a previous `alloc_array` call on `alloc`.
pub(crate) unsafe fn release_array<T, A>(alloc: &A, ptr: NonNull<T>, len: usize)
where
    A: Allocator + ?Sized,
{
    // The same layout was computed successfully when the array was allocated.
    if let Ok(layout) = Layout::array::<T>(len) {
        alloc.release(ptr.cast(), layout);
    }
}
