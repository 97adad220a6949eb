//! Binary and hex file persistence for any [`BlockMemory`].
//!
//! Files hold the raw item bytes in host byte order, block after block, with
//! no header. Whether each block contributes only its logical items or its
//! full padded size is decided by [`BlockMemoryConfig::persist_padding`].
//! Loading always treats the whole file as items, so either kind of file can
//! be loaded into any block count.
//!
//! [`BlockMemoryConfig::persist_padding`]: crate::BlockMemoryConfig::persist_padding

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::mem::size_of;
use std::path::Path;

use bytemuck::Pod;
use log::{debug, warn};

use crate::block::BlockMemory;
use crate::error::{BlockMemoryError, Result};
use crate::hexdump::{buffer_to_hex, hex_to_buffer};

/// Number of leading bytes of block `block` that hold logical items.
fn logical_bytes<T, M>(mem: &M, block: usize) -> usize
where
    T: Pod,
    M: BlockMemory<T> + ?Sized,
{
    let first = block * mem.block_length();
    let items = mem.length().saturating_sub(first).min(mem.block_length());
    items * size_of::<T>()
}

/// The bytes of block `block` that go to a file.
fn persisted_bytes<T, M>(mem: &M, block: usize) -> &[u8]
where
    T: Pod,
    M: BlockMemory<T> + ?Sized,
{
    let bytes = mem.block_bytes(block);
    if mem.config().persist_padding {
        bytes
    } else {
        &bytes[..logical_bytes::<T, M>(mem, block)]
    }
}

fn allocated_blocks<T, M>(mem: &M) -> usize
where
    T: Pod,
    M: BlockMemory<T> + ?Sized,
{
    if mem.is_allocated() {
        mem.no_of_blocks()
    } else {
        0
    }
}

pub(crate) fn save_to_file<T, M>(mem: &M, path: &Path) -> Result<()>
where
    T: Pod,
    M: BlockMemory<T> + ?Sized,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0;
    for block in 0..allocated_blocks::<T, M>(mem) {
        let bytes = persisted_bytes::<T, M>(mem, block);
        writer.write_all(bytes)?;
        written += bytes.len();
    }
    writer.flush()?;
    debug!("saved {written} bytes to {}", path.display());
    Ok(())
}

pub(crate) fn to_hex<T, M>(mem: &M) -> String
where
    T: Pod,
    M: BlockMemory<T> + ?Sized,
{
    (0..allocated_blocks::<T, M>(mem))
        .map(|block| buffer_to_hex(persisted_bytes::<T, M>(mem, block)))
        .collect()
}

pub(crate) fn save_to_hex_file<T, M>(mem: &M, path: &Path) -> Result<()>
where
    T: Pod,
    M: BlockMemory<T> + ?Sized,
{
    let hex = to_hex::<T, M>(mem);
    fs::write(path, &hex)?;
    debug!("saved {} hex characters to {}", hex.len(), path.display());
    Ok(())
}

/// Resize to `length` items over `no_of_blocks` blocks without reallocating
/// twice when starting from nothing.
fn prepare<T, M>(mem: &mut M, length: usize, no_of_blocks: usize) -> Result<()>
where
    T: Pod,
    M: BlockMemory<T> + ?Sized,
{
    if mem.is_allocated() {
        mem.resize(length)?;
        mem.reshape(no_of_blocks)
    } else {
        mem.reshape(no_of_blocks)?;
        mem.resize(length)
    }
}

/// Restore the length and block count a container had before a failed load.
///
/// Content beyond what survived the failed preparation is not recovered.
fn rollback<T, M>(mem: &mut M, previous_length: usize, previous_blocks: usize)
where
    T: Pod,
    M: BlockMemory<T> + ?Sized,
{
    warn!("load failed, restoring {previous_length} items in {previous_blocks} blocks");
    if let Err(e) = mem.resize(previous_length) {
        warn!("rollback to {previous_length} items failed: {e}");
    }
    if let Err(e) = mem.reshape(previous_blocks) {
        warn!("rollback to {previous_blocks} blocks failed: {e}");
    }
}

pub(crate) fn load_from_file<T, M>(mem: &mut M, path: &Path, no_of_blocks: usize) -> Result<()>
where
    T: Pod,
    M: BlockMemory<T> + ?Sized,
{
    let mut file = File::open(path)?;
    let file_size = usize::try_from(file.metadata()?.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "file does not fit in memory"))?;
    let length = file_size / size_of::<T>();
    if file_size % size_of::<T>() != 0 {
        debug!(
            "{}: ignoring {} trailing bytes",
            path.display(),
            file_size % size_of::<T>()
        );
    }

    let (previous_length, previous_blocks) = (mem.length(), mem.no_of_blocks());
    if let Err(e) = prepare::<T, M>(mem, length, no_of_blocks) {
        rollback::<T, M>(mem, previous_length, previous_blocks);
        return Err(e);
    }

    let read = (0..allocated_blocks::<T, M>(mem)).try_for_each(|block| {
        let n = logical_bytes::<T, M>(&*mem, block);
        file.read_exact(&mut mem.block_bytes_mut(block)[..n])
    });
    if let Err(e) = read {
        rollback::<T, M>(mem, previous_length, previous_blocks);
        return Err(e.into());
    }

    debug!(
        "loaded {length} items from {} into {} blocks",
        path.display(),
        mem.no_of_blocks()
    );
    Ok(())
}

pub(crate) fn load_from_hex_file<T, M>(
    mem: &mut M,
    path: &Path,
    no_of_blocks: usize,
) -> Result<()>
where
    T: Pod,
    M: BlockMemory<T> + ?Sized,
{
    let content = fs::read(path)?;
    let hex = content.trim_ascii_end();
    if hex.len() % 2 != 0 {
        return Err(BlockMemoryError::invalid_hex(format!(
            "{}: odd number of characters ({})",
            path.display(),
            hex.len()
        )));
    }
    if let Some(pos) = hex.iter().position(|c| !c.is_ascii_hexdigit()) {
        return Err(BlockMemoryError::invalid_hex(format!(
            "{}: non-hex character at position {pos}",
            path.display()
        )));
    }
    let length = hex.len() / 2 / size_of::<T>();

    let (previous_length, previous_blocks) = (mem.length(), mem.no_of_blocks());
    if let Err(e) = prepare::<T, M>(mem, length, no_of_blocks) {
        rollback::<T, M>(mem, previous_length, previous_blocks);
        return Err(e);
    }

    let mut cursor = 0;
    for block in 0..allocated_blocks::<T, M>(mem) {
        let n = logical_bytes::<T, M>(mem, block);
        let chunk = &hex[cursor..cursor + 2 * n];
        if let Err(e) = hex_to_buffer(&mut mem.block_bytes_mut(block)[..n], chunk) {
            rollback::<T, M>(mem, previous_length, previous_blocks);
            return Err(e);
        }
        cursor += 2 * n;
    }

    debug!(
        "loaded {length} items from hex file {} into {} blocks",
        path.display(),
        mem.no_of_blocks()
    );
    Ok(())
}
