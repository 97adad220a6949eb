//! Low-level owning byte buffer backing a single block.
//!
//! This is the only place where block memory is touched through raw
//! pointers. Every `unsafe` block carries a `// SAFETY:` comment; everything
//! above this module works with slices.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;

use bytemuck::Pod;

use crate::alloc::Allocator;
use crate::error::{BlockMemoryError, Result};

/// One independently allocated, zero-initialized block of bytes.
///
/// The block remembers the allocator and layout it came from and releases
/// itself through that allocator on drop.
pub(crate) struct RawBlock<'a> {
    ptr: NonNull<u8>,
    layout: Layout,
    allocator: &'a dyn Allocator,
}

impl<'a> RawBlock<'a> {
    /// Allocate `size` zeroed bytes aligned to `align`.
    pub(crate) fn zeroed(size: usize, align: usize, allocator: &'a dyn Allocator) -> Result<Self> {
        let layout = Layout::from_size_align(size, align)
            .map_err(|_| BlockMemoryError::AllocationFailure { size })?;
        let ptr = allocator.allocate(layout)?;
        // SAFETY: `ptr` is valid for `layout.size()` bytes of writes.
        unsafe { ptr.as_ptr().write_bytes(0, layout.size()) };
        Ok(Self {
            ptr,
            layout,
            allocator,
        })
    }

    /// Size of the block in bytes.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        // SAFETY: the allocation is live, initialized and `len()` bytes long;
        // the shared borrow of `self` prevents concurrent mutation.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }

    #[inline]
    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, with exclusive access through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len()) }
    }

    /// The block viewed as items of `T`.
    ///
    /// The block must have been allocated with `T`'s alignment and a size
    /// that is a multiple of `size_of::<T>()`.
    #[inline]
    pub(crate) fn as_slice<T: Pod>(&self) -> &[T] {
        bytemuck::cast_slice(self.as_bytes())
    }

    #[inline]
    pub(crate) fn as_mut_slice<T: Pod>(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(self.as_bytes_mut())
    }

    /// Item `offset` of the block without any bounds check.
    ///
    /// # Safety
    ///
    /// The block must hold items of `T` (see [`as_slice`](Self::as_slice)) and
    /// `offset` must be below `len() / size_of::<T>()`.
    #[inline]
    pub(crate) unsafe fn item_unchecked<T: Pod>(&self, offset: usize) -> &T {
        // SAFETY: upheld by the caller.
        unsafe { &*self.ptr.as_ptr().cast::<T>().add(offset) }
    }

    /// # Safety
    ///
    /// Same as [`item_unchecked`](Self::item_unchecked).
    #[inline]
    pub(crate) unsafe fn item_unchecked_mut<T: Pod>(&mut self, offset: usize) -> &mut T {
        // SAFETY: upheld by the caller.
        unsafe { &mut *self.ptr.as_ptr().cast::<T>().add(offset) }
    }
}

impl AsRef<[u8]> for RawBlock<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsMut<[u8]> for RawBlock<'_> {
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_bytes_mut()
    }
}

impl Drop for RawBlock<'_> {
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `allocator.allocate(layout)` and is
        // released exactly once, here.
        unsafe { self.allocator.deallocate(self.ptr, self.layout) };
    }
}

impl fmt::Debug for RawBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBlock")
            .field("ptr", &self.ptr)
            .field("len", &self.layout.size())
            .field("align", &self.layout.align())
            .finish()
    }
}
