//! Segmented heap container.
//!
//! [`BlockHeapMemory`] stores a logical array of `T` across independently
//! allocated blocks. Resizing keeps the block topology and only adds or
//! drops trailing blocks; reshaping redistributes every byte into a new set
//! of blocks.

use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ops::{Index, IndexMut};
use std::path::Path;

use bytemuck::Pod;
use log::debug;

use crate::alloc::{Allocator, SystemAllocator};
use crate::block::{self, BlockMemory};
use crate::config::BlockMemoryConfig;
use crate::error::{BlockMemoryError, Result};
use crate::raw::RawBlock;

static SYSTEM: SystemAllocator = SystemAllocator;

/// A typed array split across multiple heap blocks.
///
/// Block storage comes from a borrowed [`Allocator`] (the global allocator
/// when none is given) and is released through it on
/// [`deallocate`](BlockHeapMemory::deallocate) or drop.
///
/// Indexing with `[]` maps the index onto a block without checking it
/// against [`length`](BlockMemory::length): any index that lands inside
/// the allocated blocks (padding included) is accepted, and an index beyond
/// them panics. [`get`](BlockHeapMemory::get) is the checked alternative and
/// [`get_unchecked`](BlockHeapMemory::get_unchecked) skips every check.
///
/// The container is deliberately not `Clone`; use
/// [`try_clone`](BlockHeapMemory::try_clone) for an explicit deep copy.
pub struct BlockHeapMemory<'a, T> {
    blocks: Vec<RawBlock<'a>>,
    /// Items per block, padding included. Zero while unallocated.
    block_length: usize,
    /// Equal to `blocks.len()` while allocated, otherwise the block count
    /// the next allocation will use.
    no_of_blocks: usize,
    length: usize,
    allocator: &'a dyn Allocator,
    config: BlockMemoryConfig,
    _items: PhantomData<T>,
}

impl<'a, T: Pod> BlockHeapMemory<'a, T> {
    /// An unallocated container using the global allocator.
    pub fn new() -> Self {
        Self::with_allocator(&SYSTEM)
    }

    /// An unallocated container drawing blocks from `allocator`.
    pub fn with_allocator(allocator: &'a dyn Allocator) -> Self {
        let config = BlockMemoryConfig::default();
        Self {
            blocks: Vec::new(),
            block_length: 0,
            no_of_blocks: config.default_no_of_blocks as usize,
            length: 0,
            allocator,
            config,
            _items: PhantomData,
        }
    }

    /// `length` items over the default number of blocks.
    pub fn with_length(length: usize) -> Result<Self> {
        let mut mem = Self::new();
        mem.resize(length)?;
        Ok(mem)
    }

    /// `length` items over `no_of_blocks` blocks.
    pub fn with_blocks(length: usize, no_of_blocks: usize) -> Result<Self> {
        Self::with_blocks_in(length, no_of_blocks, &SYSTEM)
    }

    /// `length` items over `no_of_blocks` blocks drawn from `allocator`.
    pub fn with_blocks_in(
        length: usize,
        no_of_blocks: usize,
        allocator: &'a dyn Allocator,
    ) -> Result<Self> {
        let mut mem = Self::with_allocator(allocator);
        mem.allocate(length, no_of_blocks)?;
        Ok(mem)
    }

    /// A container holding the items stored in `path`, over the default
    /// number of blocks.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut mem = Self::new();
        mem.load_from_file(path)?;
        Ok(mem)
    }

    /// A container holding the items stored in `path`, over `no_of_blocks`
    /// blocks.
    pub fn from_file_with_blocks(path: impl AsRef<Path>, no_of_blocks: usize) -> Result<Self> {
        let mut mem = Self::new();
        mem.load_from_file_with_blocks(path, no_of_blocks)?;
        Ok(mem)
    }

    /// Replace the configuration.
    ///
    /// On an unallocated container the pending block count is reset to the
    /// new default. Existing blocks are not touched.
    pub fn with_config(mut self, config: BlockMemoryConfig) -> Self {
        if !self.is_allocated() {
            self.no_of_blocks = config.default_no_of_blocks.max(1) as usize;
        }
        self.config = config;
        self
    }

    /// The allocator blocks are drawn from.
    pub fn allocator(&self) -> &'a dyn Allocator {
        self.allocator
    }

    /// Record the block count the next allocation will use. Ignored while
    /// allocated or for zero.
    pub(crate) fn set_pending_blocks(&mut self, no_of_blocks: usize) {
        if !self.is_allocated() && no_of_blocks > 0 {
            self.no_of_blocks = no_of_blocks;
        }
    }

    fn alloc_blocks(&self, count: usize, block_size: usize) -> Result<Vec<RawBlock<'a>>> {
        let allocator = self.allocator;
        (0..count)
            .map(|_| RawBlock::zeroed(block_size, align_of::<T>(), allocator))
            .collect()
    }

    /// Items and bytes per block for `length` items over `no_of_blocks`
    /// blocks, failing if either count overflows.
    fn geometry(length: usize, no_of_blocks: usize) -> Result<(usize, usize)> {
        block::block_length_for(length, no_of_blocks)
            .and_then(|block_length| {
                let block_size = block_length.checked_mul(size_of::<T>())?;
                Some((block_length, block_size))
            })
            .ok_or(BlockMemoryError::AllocationFailure { size: usize::MAX })
    }

    /// Allocate fresh storage for `length` items over `no_of_blocks` blocks,
    /// replacing any existing storage and its content.
    ///
    /// Each block holds `length / no_of_blocks + 1` items. A zero `length`
    /// deallocates and records `no_of_blocks` for the next allocation. On
    /// failure every block obtained so far is released and the container
    /// keeps its previous state.
    pub fn allocate(&mut self, length: usize, no_of_blocks: usize) -> Result<()> {
        if no_of_blocks == 0 {
            return Err(BlockMemoryError::AllocationFailure { size: 0 });
        }
        if length == 0 {
            self.deallocate();
            self.set_pending_blocks(no_of_blocks);
            return Ok(());
        }

        let (block_length, block_size) = Self::geometry(length, no_of_blocks)?;
        let blocks = self.alloc_blocks(no_of_blocks, block_size)?;

        self.blocks = blocks;
        self.block_length = block_length;
        self.no_of_blocks = no_of_blocks;
        self.length = length;
        debug!("allocated {length} items in {no_of_blocks} blocks of {block_size} bytes");
        Ok(())
    }

    /// Release every block and return to the unallocated state.
    ///
    /// The pending block count is reset to the configured default.
    /// Calling this on an unallocated container does nothing else.
    pub fn deallocate(&mut self) {
        if self.is_allocated() {
            debug!(
                "deallocating {} items in {} blocks",
                self.length,
                self.blocks.len()
            );
        }
        self.blocks.clear();
        self.block_length = 0;
        self.length = 0;
        self.no_of_blocks = self.config.default_no_of_blocks.max(1) as usize;
    }

    /// Change the logical length to `length`, preserving `[0, min(old, new))`.
    ///
    /// The block length never changes here. If the current blocks can already
    /// address `length` items only the length is updated; otherwise trailing
    /// blocks are appended or released. Retained blocks are neither moved nor
    /// copied. A zero `length` deallocates; resizing an unallocated container
    /// allocates it with the pending block count.
    ///
    /// Items exposed by growth have unspecified values.
    pub fn resize(&mut self, length: usize) -> Result<()> {
        if length == self.length {
            return Ok(());
        }
        if length == 0 {
            self.deallocate();
            return Ok(());
        }
        if !self.is_allocated() {
            return self.allocate(length, self.no_of_blocks);
        }

        let needed = length.div_ceil(self.block_length);
        let current = self.blocks.len();
        if needed > current {
            let fresh = self.alloc_blocks(needed - current, self.block_size())?;
            self.blocks.extend(fresh);
        } else if needed < current {
            self.blocks.truncate(needed);
        }
        if needed != current {
            debug!(
                "resize {} -> {length} items: {current} -> {needed} blocks",
                self.length
            );
        }

        self.no_of_blocks = needed;
        self.length = length;
        Ok(())
    }

    /// Spread the content over `no_of_blocks` blocks.
    ///
    /// Does nothing for zero or the current count. On an unallocated
    /// container only the pending block count changes. Otherwise a new block
    /// set sized `length / no_of_blocks + 1` items per block is allocated,
    /// every logical byte is copied across in one pass, and the old blocks
    /// are released. On allocation failure the container is unchanged.
    pub fn reshape(&mut self, no_of_blocks: usize) -> Result<()> {
        if no_of_blocks == 0 || no_of_blocks == self.no_of_blocks {
            return Ok(());
        }
        if !self.is_allocated() {
            self.set_pending_blocks(no_of_blocks);
            return Ok(());
        }

        let (block_length, block_size) = Self::geometry(self.length, no_of_blocks)?;
        let mut blocks = self.alloc_blocks(no_of_blocks, block_size)?;

        block::redistribute(&self.blocks, &mut blocks, self.size_in_bytes());
        debug!(
            "reshaped {} items: {} -> {no_of_blocks} blocks of {block_size} bytes",
            self.length,
            self.blocks.len()
        );

        self.blocks = blocks;
        self.block_length = block_length;
        self.no_of_blocks = no_of_blocks;
        Ok(())
    }

    /// Item `index`, or `None` if `index >= length`.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.length {
            return None;
        }
        let (block, offset) = self.locate(index);
        Some(&self.blocks[block].as_slice::<T>()[offset])
    }

    /// Mutable item `index`, or `None` if `index >= length`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.length {
            return None;
        }
        let (block, offset) = self.locate(index);
        Some(&mut self.blocks[block].as_mut_slice::<T>()[offset])
    }

    /// Item `index` without any check.
    ///
    /// # Safety
    ///
    /// The container must be allocated and `index < length`.
    #[allow(unsafe_code)]
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        let (block, offset) = self.locate(index);
        // SAFETY: index < length, so block < blocks.len() and
        // offset < block_length.
        unsafe { self.blocks.get_unchecked(block).item_unchecked(offset) }
    }

    /// Mutable item `index` without any check.
    ///
    /// # Safety
    ///
    /// Same as [`get_unchecked`](Self::get_unchecked).
    #[allow(unsafe_code)]
    #[inline]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        let (block, offset) = self.locate(index);
        // SAFETY: see `get_unchecked`.
        unsafe { self.blocks.get_unchecked_mut(block).item_unchecked_mut(offset) }
    }

    /// Iterate over the logical items in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + use<'_, 'a, T> {
        self.blocks
            .iter()
            .flat_map(|block| block.as_slice::<T>())
            .take(self.length)
    }

    /// Copy the logical items into a `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().copied().collect()
    }

    /// Copy `items` into the container starting at logical `offset`.
    ///
    /// Fails with [`BlockMemoryError::OutOfRange`] without writing anything if
    /// the items would extend past the logical length.
    pub fn write(&mut self, offset: usize, items: &[T]) -> Result<()> {
        self.check_span(offset, items.len())?;
        let mut position = offset;
        let mut rest = items;
        while !rest.is_empty() {
            let (block, start) = self.locate(position);
            let dst = &mut self.blocks[block].as_mut_slice::<T>()[start..];
            let n = dst.len().min(rest.len());
            dst[..n].copy_from_slice(&rest[..n]);
            rest = &rest[n..];
            position += n;
        }
        Ok(())
    }

    /// Copy `out.len()` items starting at logical `offset` into `out`.
    ///
    /// Fails with [`BlockMemoryError::OutOfRange`] if the range extends past
    /// the logical length.
    pub fn read(&self, offset: usize, out: &mut [T]) -> Result<()> {
        self.check_span(offset, out.len())?;
        let mut position = offset;
        let mut filled = 0;
        while filled < out.len() {
            let (block, start) = self.locate(position);
            let src = &self.blocks[block].as_slice::<T>()[start..];
            let n = src.len().min(out.len() - filled);
            out[filled..filled + n].copy_from_slice(&src[..n]);
            filled += n;
            position += n;
        }
        Ok(())
    }

    fn check_span(&self, offset: usize, count: usize) -> Result<()> {
        match offset.checked_add(count) {
            Some(end) if end <= self.length => Ok(()),
            _ => Err(BlockMemoryError::OutOfRange {
                index: offset,
                size: count * size_of::<T>(),
                available: self.length.saturating_sub(offset) * size_of::<T>(),
            }),
        }
    }

    /// Deep copy into freshly allocated blocks from the same allocator, with
    /// the same topology and configuration.
    pub fn try_clone(&self) -> Result<Self> {
        let mut copy = Self::with_allocator(self.allocator).with_config(self.config.clone());
        copy.no_of_blocks = self.no_of_blocks;
        if !self.is_allocated() {
            return Ok(copy);
        }
        let mut blocks = self.alloc_blocks(self.blocks.len(), self.block_size())?;
        for (dst, src) in blocks.iter_mut().zip(&self.blocks) {
            dst.as_bytes_mut().copy_from_slice(src.as_bytes());
        }
        copy.blocks = blocks;
        copy.block_length = self.block_length;
        copy.length = self.length;
        Ok(copy)
    }

    pub(crate) fn block_items(&self, block: usize) -> &[T] {
        self.blocks[block].as_slice()
    }

    pub(crate) fn block_items_mut(&mut self, block: usize) -> &mut [T] {
        self.blocks[block].as_mut_slice()
    }
}

impl<T: Pod> BlockMemory<T> for BlockHeapMemory<'_, T> {
    fn no_of_blocks(&self) -> usize {
        self.no_of_blocks
    }

    fn length(&self) -> usize {
        self.length
    }

    fn block_length(&self) -> usize {
        self.block_length
    }

    fn config(&self) -> &BlockMemoryConfig {
        &self.config
    }

    fn block_bytes(&self, block: usize) -> &[u8] {
        self.blocks[block].as_bytes()
    }

    fn block_bytes_mut(&mut self, block: usize) -> &mut [u8] {
        self.blocks[block].as_bytes_mut()
    }

    fn resize(&mut self, length: usize) -> Result<()> {
        BlockHeapMemory::resize(self, length)
    }

    fn reshape(&mut self, no_of_blocks: usize) -> Result<()> {
        BlockHeapMemory::reshape(self, no_of_blocks)
    }
}

impl<T: Pod> Default for BlockHeapMemory<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod> Index<usize> for BlockHeapMemory<'_, T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        assert!(self.is_allocated(), "index {index} into unallocated block memory");
        let (block, offset) = self.locate(index);
        &self.blocks[block].as_slice::<T>()[offset]
    }
}

impl<T: Pod> IndexMut<usize> for BlockHeapMemory<'_, T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        assert!(self.is_allocated(), "index {index} into unallocated block memory");
        let (block, offset) = self.locate(index);
        &mut self.blocks[block].as_mut_slice::<T>()[offset]
    }
}

impl<T> fmt::Debug for BlockHeapMemory<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockHeapMemory")
            .field("length", &self.length)
            .field("no_of_blocks", &self.no_of_blocks)
            .field("block_length", &self.block_length)
            .field("config", &self.config)
            .finish()
    }
}
