//! Thin wrappers over [`std::alloc`].
//!
//! The page allocator is an external collaborator this crate never tries to
//! out-smart: a failed allocation becomes [`PoolError::OutOfMemory`] instead
//! of a panic or an abort, at every call site that touches the heap.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::PoolError;

/// Allocates `size` bytes aligned to `align`, uninitialized.
///
/// # Errors
///
/// Returns [`PoolError::OutOfMemory`] if `size`/`align` cannot form a valid
/// [`Layout`], or if the allocator itself returns null.
pub fn alloc(size: usize, align: usize) -> Result<NonNull<u8>, PoolError> {
    let layout = Layout::from_size_align(size, align).map_err(|_| PoolError::OutOfMemory)?;
    // SAFETY: `layout` has non-zero size as long as `size > 0`; callers in
    // this crate never request a zero-sized raw allocation.
    let ptr = unsafe { alloc::alloc(layout) };
    NonNull::new(ptr).ok_or(PoolError::OutOfMemory)
}

/// Allocates `size` bytes aligned to `align`, zero-filled.
pub fn alloc_zeroed(size: usize, align: usize) -> Result<NonNull<u8>, PoolError> {
    let layout = Layout::from_size_align(size, align).map_err(|_| PoolError::OutOfMemory)?;
    // SAFETY: same precondition as `alloc`.
    let ptr = unsafe { alloc::alloc_zeroed(layout) };
    NonNull::new(ptr).ok_or(PoolError::OutOfMemory)
}

/// Frees a block previously returned by [`alloc`] or [`alloc_zeroed`] with
/// the exact same `size`/`align` it was allocated with.
///
/// # Safety
///
/// `ptr` must have been obtained from this module with a layout matching
/// `size`/`align`, and must not already have been freed.
pub unsafe fn dealloc(ptr: NonNull<u8>, size: usize, align: usize) {
    // SAFETY: caller guarantees `ptr`/`size`/`align` describe a live
    // allocation made with the matching layout.
    let layout = Layout::from_size_align_unchecked(size, align);
    unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_roundtrip() {
        let ptr = alloc(64, 8).unwrap();
        unsafe {
            ptr.as_ptr().write_bytes(0xAB, 64);
            dealloc(ptr, 64, 8);
        }
    }

    #[test]
    fn alloc_zeroed_is_zero() {
        let ptr = alloc_zeroed(32, 8).unwrap();
        unsafe {
            let slice = std::slice::from_raw_parts(ptr.as_ptr(), 32);
            assert!(slice.iter().all(|&b| b == 0));
            dealloc(ptr, 32, 8);
        }
    }

    #[test]
    fn invalid_layout_is_out_of_memory() {
        // align not a power of two
        assert_eq!(alloc(16, 3), Err(PoolError::OutOfMemory));
    }
}
