//! Benchmark profiles for blockmem containers.
//!
//! - [`reference_profile`]: 64K `u32` items over 16 blocks
//! - [`stress_profile`]: 4M `u32` items over 64 blocks
//! - [`sequential_container`]: a container filled with `mem[i] = i`

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use blockmem::{BlockHeapMemory, Result};

/// Container geometry used by a benchmark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Profile {
    /// Logical item count.
    pub length: usize,
    /// Block count.
    pub no_of_blocks: usize,
}

/// 64K items (256 KiB of `u32`) over 16 blocks.
pub fn reference_profile() -> Profile {
    Profile {
        length: 64 * 1024,
        no_of_blocks: 16,
    }
}

/// 4M items (16 MiB of `u32`) over 64 blocks.
pub fn stress_profile() -> Profile {
    Profile {
        length: 4 * 1024 * 1024,
        no_of_blocks: 64,
    }
}

/// Allocate a container for `profile` and set every item to its index.
pub fn sequential_container(profile: Profile) -> Result<BlockHeapMemory<'static, u32>> {
    let mut mem = BlockHeapMemory::with_blocks(profile.length, profile.no_of_blocks)?;
    for i in 0..profile.length {
        mem[i] = i as u32;
    }
    Ok(mem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockmem::BlockMemory;

    #[test]
    fn reference_container_is_sequential() {
        let mem = sequential_container(reference_profile()).unwrap();
        assert_eq!(mem.no_of_blocks(), 16);
        assert_eq!(mem.length(), 64 * 1024);
        assert_eq!(mem[1000], 1000);
        assert_eq!(mem.get(64 * 1024 - 1), Some(&(64 * 1024 - 1)));
    }
}
