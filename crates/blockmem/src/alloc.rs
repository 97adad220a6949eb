//! Pluggable allocation strategy for block buffers.
//!
//! Containers borrow an [`Allocator`] for their whole lifetime and never own
//! it. When no allocator is supplied, [`SystemAllocator`] (the global Rust
//! allocator) is used.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{BlockMemoryError, Result};

/// Raw storage provider used by block memory containers.
///
/// Every successful [`allocate`](Allocator::allocate) is matched by exactly
/// one [`deallocate`](Allocator::deallocate) with the same layout.
pub trait Allocator {
    /// Allocate storage described by `layout`.
    ///
    /// The returned memory may be uninitialized; containers zero it before
    /// use. Fails with [`BlockMemoryError::AllocationFailure`] when no storage
    /// is available.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>>;

    /// Release storage previously returned by [`allocate`](Allocator::allocate).
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this allocator with the
    /// same `layout`, and must not have been deallocated already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

impl<A: Allocator + ?Sized> Allocator for &A {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        (**self).allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded verbatim, the caller upholds the contract.
        unsafe { (**self).deallocate(ptr, layout) }
    }
}

/// The global Rust allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        if layout.size() == 0 {
            return Err(BlockMemoryError::AllocationFailure { size: 0 });
        }
        // SAFETY: layout has a non-zero size.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(BlockMemoryError::AllocationFailure {
            size: layout.size(),
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: ptr came from `std::alloc::alloc` with this layout.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// An allocator wrapper that counts allocations and live bytes.
///
/// Useful to verify that containers release everything they allocate, and
/// to report memory usage of a group of containers sharing one allocator.
#[derive(Debug, Default)]
pub struct CountingAllocator<A = SystemAllocator> {
    inner: A,
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    live_bytes: AtomicUsize,
    peak_bytes: AtomicUsize,
}

impl CountingAllocator<SystemAllocator> {
    /// Count allocations made through the global allocator.
    pub fn new() -> Self {
        Self::wrap(SystemAllocator)
    }
}

impl<A> CountingAllocator<A> {
    /// Count allocations made through `inner`.
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            allocations: AtomicUsize::new(0),
            deallocations: AtomicUsize::new(0),
            live_bytes: AtomicUsize::new(0),
            peak_bytes: AtomicUsize::new(0),
        }
    }

    /// Number of successful allocations.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Number of deallocations.
    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::Relaxed)
    }

    /// Allocations not yet released.
    pub fn live_allocations(&self) -> usize {
        self.allocations() - self.deallocations()
    }

    /// Bytes currently held by live allocations.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }

    /// Highest value `live_bytes` has reached.
    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    /// The wrapped allocator.
    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: Allocator> Allocator for CountingAllocator<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        let ptr = self.inner.allocate(layout)?;
        self.allocations.fetch_add(1, Ordering::Relaxed);
        let live = self.live_bytes.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
        self.peak_bytes.fetch_max(live, Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.deallocations.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(layout.size(), Ordering::Relaxed);
        // SAFETY: forwarded verbatim, the caller upholds the contract.
        unsafe { self.inner.deallocate(ptr, layout) }
    }
}
