//! Block arithmetic and the contract shared by segmented containers.
//!
//! A container of logical length `L` split into `B` blocks gives every block
//! room for `L / B + 1` items. The extra item is deliberate padding: it keeps
//! `B * block_length >= L` without a ceiling division and leaves slack for
//! resize. Logical item `i` lives in block `i / block_length` at item offset
//! `i % block_length`, so the concatenation of all blocks, byte for byte, is
//! the logical array followed by padding.

use std::mem::size_of;
use std::ops::Range;
use std::path::Path;

use bytemuck::Pod;

use crate::config::BlockMemoryConfig;
use crate::error::{BlockMemoryError, Result};
use crate::persist;

/// Items per block for `length` items spread over `no_of_blocks` blocks, or
/// `None` if that count does not fit in a `usize`.
///
/// # Panics
///
/// Panics if `no_of_blocks` is zero.
#[inline]
pub fn block_length_for(length: usize, no_of_blocks: usize) -> Option<usize> {
    (length / no_of_blocks).checked_add(1)
}

/// Map a logical item index to `(block_index, item_offset)`.
///
/// # Panics
///
/// Panics if `block_length` is zero.
#[inline]
pub fn locate(index: usize, block_length: usize) -> (usize, usize) {
    (index / block_length, index % block_length)
}

/// Copy the first `total` bytes of the concatenation of `src` blocks into the
/// concatenation of `dst` blocks.
///
/// Both sides are walked once with independent cursors. Each step copies the
/// longest run that stays inside the current source block and the current
/// destination block, then advances whichever side reached its boundary.
///
/// # Panics
///
/// Panics if either side holds fewer than `total` bytes.
pub fn redistribute<S, D>(src: &[S], dst: &mut [D], total: usize)
where
    S: AsRef<[u8]>,
    D: AsMut<[u8]>,
{
    let (mut src_block, mut src_offset) = (0, 0);
    let (mut dst_block, mut dst_offset) = (0, 0);
    let mut copied = 0;

    while copied < total {
        let from = src[src_block].as_ref();
        let to = dst[dst_block].as_mut();

        let run = (from.len() - src_offset)
            .min(to.len() - dst_offset)
            .min(total - copied);
        to[dst_offset..dst_offset + run].copy_from_slice(&from[src_offset..src_offset + run]);
        log::trace!(
            "redistribute: {run} bytes from block {src_block}+{src_offset} to block {dst_block}+{dst_offset}"
        );

        src_offset += run;
        dst_offset += run;
        copied += run;

        if src_offset == from.len() {
            src_block += 1;
            src_offset = 0;
        }
        if dst_offset == to.len() {
            dst_block += 1;
            dst_offset = 0;
        }
    }
}

/// Block/length bookkeeping and typed byte access common to all
/// segmented containers.
///
/// Implementors provide the block storage and the two topology-changing
/// operations; typed accessors and persistence come for free.
pub trait BlockMemory<T: Pod> {
    /// Number of blocks. On an unallocated container this is the block count
    /// the next allocation will use.
    fn no_of_blocks(&self) -> usize;

    /// Number of valid, caller-visible items.
    fn length(&self) -> usize;

    /// Items addressable per block, padding included. Zero when unallocated.
    fn block_length(&self) -> usize;

    /// Configuration this container was built with.
    fn config(&self) -> &BlockMemoryConfig;

    /// Raw bytes of block `block`, padding included.
    ///
    /// # Panics
    ///
    /// Panics if `block >= no_of_blocks()` or the container is unallocated.
    fn block_bytes(&self, block: usize) -> &[u8];

    /// Mutable raw bytes of block `block`, padding included.
    ///
    /// # Panics
    ///
    /// Same as [`block_bytes`](BlockMemory::block_bytes).
    fn block_bytes_mut(&mut self, block: usize) -> &mut [u8];

    /// Change the logical length, preserving the common prefix.
    fn resize(&mut self, length: usize) -> Result<()>;

    /// Change the number of blocks, preserving all logical content.
    fn reshape(&mut self, no_of_blocks: usize) -> Result<()>;

    /// Whether block storage currently exists.
    fn is_allocated(&self) -> bool {
        self.block_length() > 0
    }

    /// `true` if the logical length is zero.
    fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Bytes per block, padding included.
    fn block_size(&self) -> usize {
        self.block_length() * size_of::<T>()
    }

    /// Bytes covered by the logical length.
    fn size_in_bytes(&self) -> usize {
        self.length() * size_of::<T>()
    }

    /// Bytes held by all blocks, padding included.
    fn capacity_in_bytes(&self) -> usize {
        if self.is_allocated() {
            self.no_of_blocks() * self.block_size()
        } else {
            0
        }
    }

    /// Map a logical index to `(block_index, item_offset)`.
    ///
    /// # Panics
    ///
    /// Panics if the container is unallocated.
    fn locate(&self, index: usize) -> (usize, usize) {
        locate(index, self.block_length())
    }

    /// Read the bytes starting at item `index` as a `U`.
    ///
    /// The read must fit inside the block holding `index`; it may extend into
    /// that block's padding but never into the next block. The address need
    /// not be aligned for `U`.
    fn get_as<U: Pod>(&self, index: usize) -> Result<U> {
        let (block, range) = typed_span::<T, Self>(self, index, size_of::<U>())?;
        Ok(bytemuck::pod_read_unaligned(&self.block_bytes(block)[range]))
    }

    /// Write `value` over the bytes starting at item `index`.
    ///
    /// Same range rules as [`get_as`](BlockMemory::get_as). On error nothing
    /// is written.
    fn set_as<U: Pod>(&mut self, index: usize, value: U) -> Result<()> {
        let (block, range) = typed_span::<T, Self>(self, index, size_of::<U>())?;
        self.block_bytes_mut(block)[range].copy_from_slice(bytemuck::bytes_of(&value));
        Ok(())
    }

    /// Write the persisted bytes of every block, in block order, to `path`.
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        persist::save_to_file::<T, Self>(self, path.as_ref())
    }

    /// Replace the content with the items stored in `path`, keeping the
    /// current block count.
    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let no_of_blocks = self.no_of_blocks();
        persist::load_from_file::<T, Self>(self, path.as_ref(), no_of_blocks)
    }

    /// Replace the content with the items stored in `path`, spread over
    /// `no_of_blocks` blocks.
    fn load_from_file_with_blocks(
        &mut self,
        path: impl AsRef<Path>,
        no_of_blocks: usize,
    ) -> Result<()> {
        persist::load_from_file::<T, Self>(self, path.as_ref(), no_of_blocks)
    }

    /// Hex rendering of the persisted bytes.
    fn to_hex(&self) -> String {
        persist::to_hex::<T, Self>(self)
    }

    /// Write [`to_hex`](BlockMemory::to_hex) to `path`.
    fn save_to_hex_file(&self, path: impl AsRef<Path>) -> Result<()> {
        persist::save_to_hex_file::<T, Self>(self, path.as_ref())
    }

    /// Hex counterpart of [`load_from_file`](BlockMemory::load_from_file).
    fn load_from_hex_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let no_of_blocks = self.no_of_blocks();
        persist::load_from_hex_file::<T, Self>(self, path.as_ref(), no_of_blocks)
    }

    /// Hex counterpart of
    /// [`load_from_file_with_blocks`](BlockMemory::load_from_file_with_blocks).
    fn load_from_hex_file_with_blocks(
        &mut self,
        path: impl AsRef<Path>,
        no_of_blocks: usize,
    ) -> Result<()> {
        persist::load_from_hex_file::<T, Self>(self, path.as_ref(), no_of_blocks)
    }
}

/// Block index and byte range for a `size`-byte typed access at item `index`.
fn typed_span<T, M>(mem: &M, index: usize, size: usize) -> Result<(usize, Range<usize>)>
where
    T: Pod,
    M: BlockMemory<T> + ?Sized,
{
    if index >= mem.length() {
        return Err(BlockMemoryError::OutOfRange {
            index,
            size,
            available: 0,
        });
    }
    let (block, offset) = mem.locate(index);
    let start = offset * size_of::<T>();
    let available = mem.block_size() - start;
    if available < size {
        return Err(BlockMemoryError::OutOfRange {
            index,
            size,
            available,
        });
    }
    Ok((block, start..start + size))
}
