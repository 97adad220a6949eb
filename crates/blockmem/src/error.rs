//! Error types for block memory operations.

use std::io;

use thiserror::Error;

/// Errors that can occur while allocating, accessing or persisting block memory.
#[derive(Debug, Error)]
pub enum BlockMemoryError {
    /// The allocator could not provide storage of the requested size.
    ///
    /// The container keeps the state it had before the failing call.
    #[error("failed to allocate {size} bytes")]
    AllocationFailure {
        /// Number of bytes requested from the allocator.
        size: usize,
    },

    /// A checked access would read or write past the current block or
    /// past the logical length. Nothing was mutated.
    #[error("access of {size} bytes at item {index} is out of range ({available} bytes available)")]
    OutOfRange {
        /// Logical item index of the access.
        index: usize,
        /// Number of bytes the access needed.
        size: usize,
        /// Number of bytes that were actually addressable.
        available: usize,
    },

    /// Underlying file open/read/write/seek failure.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Malformed hex input. Nothing was written into the destination.
    #[error("invalid hex input: {reason}")]
    InvalidHex {
        /// Human-readable description of what was wrong with the input.
        reason: String,
    },
}

impl BlockMemoryError {
    pub(crate) fn invalid_hex(reason: impl Into<String>) -> Self {
        Self::InvalidHex {
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BlockMemoryError>;
