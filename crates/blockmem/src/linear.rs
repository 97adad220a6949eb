//! Single-block buffer.
//!
//! [`LinearHeapMemory`] is a [`BlockHeapMemory`] that always holds exactly
//! one block, so its items are contiguous and can be handed out as slices.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use bytemuck::Pod;
use log::debug;

use crate::alloc::Allocator;
use crate::block::BlockMemory;
use crate::config::BlockMemoryConfig;
use crate::error::Result;
use crate::heap::BlockHeapMemory;

/// A typed array stored in one contiguous heap block.
///
/// Dereferences to `[T]` over the logical items.
pub struct LinearHeapMemory<'a, T> {
    inner: BlockHeapMemory<'a, T>,
}

impl<'a, T: Pod> LinearHeapMemory<'a, T> {
    /// An empty buffer using the global allocator.
    pub fn new() -> Self {
        Self::pinned(BlockHeapMemory::new())
    }

    /// An empty buffer drawing its block from `allocator`.
    pub fn with_allocator(allocator: &'a dyn Allocator) -> Self {
        Self::pinned(BlockHeapMemory::with_allocator(allocator))
    }

    /// A zeroed buffer of `length` items.
    pub fn with_length(length: usize) -> Result<Self> {
        let mut mem = Self::new();
        mem.resize(length)?;
        Ok(mem)
    }

    /// A buffer holding the items stored in `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut mem = Self::new();
        mem.load_from_file(path)?;
        Ok(mem)
    }

    /// Replace the configuration. The block count stays at one.
    pub fn with_config(self, config: BlockMemoryConfig) -> Self {
        Self::pinned(self.inner.with_config(config))
    }

    fn pinned(mut inner: BlockHeapMemory<'a, T>) -> Self {
        inner.set_pending_blocks(1);
        Self { inner }
    }

    /// Change the length to `length`, preserving `[0, min(old, new))`.
    ///
    /// Growth past the current block moves the content into one larger
    /// block. A zero `length` releases the block. On failure the buffer is
    /// unchanged.
    pub fn resize(&mut self, length: usize) -> Result<()> {
        if length == 0 {
            self.deallocate();
            return Ok(());
        }
        if !self.inner.is_allocated() {
            self.inner.set_pending_blocks(1);
            return self.inner.resize(length);
        }
        if length <= self.inner.block_length() {
            return self.inner.resize(length);
        }

        let mut grown = BlockHeapMemory::with_blocks_in(length, 1, self.inner.allocator())?
            .with_config(self.inner.config().clone());
        let kept = self.inner.size_in_bytes();
        grown.block_bytes_mut(0)[..kept].copy_from_slice(&self.inner.block_bytes(0)[..kept]);
        debug!("linear grow {} -> {length} items", self.inner.length());
        self.inner = grown;
        Ok(())
    }

    /// Release the block.
    pub fn deallocate(&mut self) {
        self.inner.deallocate();
        self.inner.set_pending_blocks(1);
    }

    /// The logical items.
    pub fn as_slice(&self) -> &[T] {
        if self.inner.is_allocated() {
            &self.inner.block_items(0)[..self.inner.length()]
        } else {
            &[]
        }
    }

    /// The logical items, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.inner.is_allocated() {
            let length = self.inner.length();
            &mut self.inner.block_items_mut(0)[..length]
        } else {
            &mut []
        }
    }

    /// Deep copy into a freshly allocated block.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            inner: self.inner.try_clone()?,
        })
    }

    /// Give up the single-block guarantee and return the underlying
    /// segmented container.
    pub fn into_blocks(self) -> BlockHeapMemory<'a, T> {
        self.inner
    }
}

impl<T: Pod> BlockMemory<T> for LinearHeapMemory<'_, T> {
    fn no_of_blocks(&self) -> usize {
        1
    }

    fn length(&self) -> usize {
        self.inner.length()
    }

    fn block_length(&self) -> usize {
        self.inner.block_length()
    }

    fn config(&self) -> &BlockMemoryConfig {
        self.inner.config()
    }

    fn block_bytes(&self, block: usize) -> &[u8] {
        self.inner.block_bytes(block)
    }

    fn block_bytes_mut(&mut self, block: usize) -> &mut [u8] {
        self.inner.block_bytes_mut(block)
    }

    fn resize(&mut self, length: usize) -> Result<()> {
        LinearHeapMemory::resize(self, length)
    }

    /// Always keeps one block; any requested count is ignored.
    fn reshape(&mut self, _no_of_blocks: usize) -> Result<()> {
        Ok(())
    }
}

impl<T: Pod> Default for LinearHeapMemory<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod> Deref for LinearHeapMemory<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Pod> DerefMut for LinearHeapMemory<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> fmt::Debug for LinearHeapMemory<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearHeapMemory")
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::CountingAllocator;

    #[test]
    fn starts_empty_with_one_pending_block() {
        let mem: LinearHeapMemory<'_, u32> = LinearHeapMemory::new();
        assert!(mem.is_empty());
        assert!(mem.as_slice().is_empty());
        assert_eq!(mem.no_of_blocks(), 1);
    }

    #[test]
    fn grows_into_one_block_preserving_prefix() {
        let counter = CountingAllocator::new();
        let mut mem: LinearHeapMemory<'_, u16> = LinearHeapMemory::with_allocator(&counter);
        mem.resize(10).unwrap();
        for (i, item) in mem.iter_mut().enumerate() {
            *item = i as u16;
        }
        mem.resize(1000).unwrap();
        assert_eq!(counter.live_allocations(), 1);
        assert_eq!(mem.len(), 1000);
        assert_eq!(&mem[..10], &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);

        mem.resize(4).unwrap();
        assert_eq!(mem.as_slice(), &[0, 1, 2, 3]);
        assert_eq!(counter.live_allocations(), 1);
    }

    #[test]
    fn resize_to_zero_and_back_stays_linear() {
        let mut mem: LinearHeapMemory<'_, u8> = LinearHeapMemory::with_length(8).unwrap();
        mem.resize(0).unwrap();
        assert!(mem.as_slice().is_empty());
        mem.resize(100).unwrap();
        assert_eq!(mem.block_length(), 101);
        assert_eq!(mem.into_blocks().no_of_blocks(), 1);
    }

    #[test]
    fn emptied_buffer_stays_single_block() {
        let mut mem: LinearHeapMemory<'_, u32> = LinearHeapMemory::with_length(8).unwrap();
        mem.resize(0).unwrap();
        let mut blocks = mem.into_blocks();
        assert!(!blocks.is_allocated());
        assert_eq!(blocks.no_of_blocks(), 1);
        blocks.resize(40).unwrap();
        assert_eq!(blocks.block_length(), 41);

        let mut mem: LinearHeapMemory<'_, u32> = LinearHeapMemory::with_length(8).unwrap();
        mem.deallocate();
        assert_eq!(mem.into_blocks().no_of_blocks(), 1);
    }

    #[test]
    fn reshape_is_ignored() {
        let mut mem: LinearHeapMemory<'_, u64> = LinearHeapMemory::with_length(50).unwrap();
        BlockMemory::reshape(&mut mem, 7).unwrap();
        assert_eq!(mem.no_of_blocks(), 1);
        assert_eq!(mem.block_length(), 51);
    }

    #[test]
    fn typed_access_spans_whole_buffer() {
        let mut mem: LinearHeapMemory<'_, u8> = LinearHeapMemory::with_length(64).unwrap();
        mem.set_as::<u64>(40, 0x0102_0304_0506_0708).unwrap();
        assert_eq!(
            &mem[40..48],
            &0x0102_0304_0506_0708u64.to_ne_bytes()
        );
    }

    #[test]
    fn with_config_keeps_single_block() {
        let config = BlockMemoryConfig::default().with_default_no_of_blocks(9);
        let mut mem: LinearHeapMemory<'_, u32> = LinearHeapMemory::new().with_config(config);
        mem.resize(30).unwrap();
        let blocks = mem.into_blocks();
        assert_eq!(blocks.no_of_blocks(), 1);
        assert_eq!(blocks.block_length(), 31);
    }
}
