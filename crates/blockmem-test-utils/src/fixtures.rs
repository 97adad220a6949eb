//! Reusable block memory fixtures.
//!
//! - [`FailingAllocator`]: succeeds a fixed number of times, then refuses.
//! - [`fill_sequential`] / [`assert_sequential`]: write and check
//!   `mem[i] == i` over the whole logical length.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use blockmem::{Allocator, BlockHeapMemory, BlockMemoryError, CountingAllocator};

/// Allocator that hands out `succeed_count` allocations, then fails every
/// further request with [`BlockMemoryError::AllocationFailure`].
///
/// Successful allocations go through a [`CountingAllocator`], so tests can
/// also check that nothing leaks on the failure path.
#[derive(Debug)]
pub struct FailingAllocator {
    inner: CountingAllocator,
    succeed_count: AtomicUsize,
    calls: AtomicUsize,
}

impl FailingAllocator {
    /// An allocator that succeeds `succeed_count` times then fails.
    pub fn new(succeed_count: usize) -> Self {
        Self {
            inner: CountingAllocator::new(),
            succeed_count: AtomicUsize::new(succeed_count),
            calls: AtomicUsize::new(0),
        }
    }

    /// Allow `succeed_count` more allocations from now on.
    pub fn arm(&self, succeed_count: usize) {
        self.calls.store(0, Ordering::Relaxed);
        self.succeed_count.store(succeed_count, Ordering::Relaxed);
    }

    /// How many times `allocate` has been called since the last [`arm`](Self::arm).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Allocations handed out and not yet released.
    pub fn live_allocations(&self) -> usize {
        self.inner.live_allocations()
    }
}

#[allow(unsafe_code)]
impl Allocator for FailingAllocator {
    fn allocate(&self, layout: Layout) -> blockmem::Result<NonNull<u8>> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count.load(Ordering::Relaxed) {
            return Err(BlockMemoryError::AllocationFailure {
                size: layout.size(),
            });
        }
        self.inner.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: only pointers from `inner` are ever handed out.
        unsafe { self.inner.deallocate(ptr, layout) }
    }
}

/// Set `mem[i] = i` for every logical index.
pub fn fill_sequential(mem: &mut BlockHeapMemory<'_, u32>) {
    for i in 0..blockmem::BlockMemory::length(mem) {
        mem[i] = i as u32;
    }
}

/// Assert `mem[i] == i` for every index below `length`, and that the
/// container holds exactly `length` items.
pub fn assert_sequential(mem: &BlockHeapMemory<'_, u32>, length: usize) {
    assert_eq!(blockmem::BlockMemory::length(mem), length, "logical length");
    for i in 0..length {
        assert_eq!(mem[i], i as u32, "item {i}");
    }
}
