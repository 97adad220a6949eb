//! Test utilities for blockmem development.
//!
//! Provides an allocator that fails on demand ([`FailingAllocator`]) and
//! helpers that fill and verify containers with a recognisable pattern.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{assert_sequential, fill_sequential, FailingAllocator};
