//! Segmented, resizable and reshapeable typed block memory.
//!
//! A logical array of plain-old-data items is stored across a configurable
//! number of independently allocated heap blocks. Items are addressed by a
//! single logical index; the container maps it onto a block and an offset.
//!
//! # Architecture
//!
//! ```text
//! BlockHeapMemory<'a, T> (segmented container)
//! ├── &'a dyn Allocator (borrowed, SystemAllocator by default)
//! ├── RawBlock × no_of_blocks (zeroed, length / no_of_blocks + 1 items each)
//! └── BlockMemoryConfig (default block count, padding persistence)
//!
//! LinearHeapMemory<'a, T> (same engine pinned to one block, derefs to [T])
//! ```
//!
//! # Resize and reshape
//!
//! - **Resize** changes the logical length. The block length is kept and
//!   only trailing blocks are added or released, so retained items are
//!   never moved.
//! - **Reshape** changes the block count. Every logical byte is copied
//!   once into a freshly allocated set of blocks.
//!
//! # Persistence
//!
//! Any [`BlockMemory`] can be saved to and loaded from a raw binary file or
//! a hex text file. Files hold item bytes in host byte order with no header,
//! so they are not portable across endianness.
//!
//! `unsafe` code is confined to the allocator boundary, the block buffer
//! and the explicitly unchecked accessors.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod alloc;
pub mod block;
pub mod config;
pub mod error;
pub mod heap;
pub mod hexdump;
pub mod linear;
mod persist;
mod raw;

// Public re-exports for the primary API surface.
pub use alloc::{Allocator, CountingAllocator, SystemAllocator};
pub use block::BlockMemory;
pub use config::BlockMemoryConfig;
pub use error::{BlockMemoryError, Result};
pub use heap::BlockHeapMemory;
pub use hexdump::{buffer_to_hex, hex_to_buffer};
pub use linear::LinearHeapMemory;
