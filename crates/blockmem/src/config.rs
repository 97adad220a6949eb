//! Block memory configuration parameters.

/// Configuration shared by block memory containers.
///
/// Controls the block count used when a container allocates without an
/// explicit block count, and which bytes file persistence writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockMemoryConfig {
    /// Number of blocks used by `allocate` paths that do not name a block
    /// count (construction from a length, resize from empty, deallocate).
    ///
    /// Default: 4. Must be non-zero; [`with_default_no_of_blocks`] clamps
    /// zero up to one.
    ///
    /// [`with_default_no_of_blocks`]: BlockMemoryConfig::with_default_no_of_blocks
    pub default_no_of_blocks: u16,

    /// Whether `save_to_file` / `to_hex` emit every block's padding bytes.
    ///
    /// When `false` (the default) exactly `length * size_of::<T>()` bytes are
    /// written and files load identically into any block count. When `true`
    /// each block contributes its full `block_size` bytes, so the file length
    /// depends on the block topology at save time.
    pub persist_padding: bool,
}

impl BlockMemoryConfig {
    /// Default number of blocks.
    pub const DEFAULT_NO_OF_BLOCKS: u16 = 4;

    /// Create a config with default values.
    pub const fn new() -> Self {
        Self {
            default_no_of_blocks: Self::DEFAULT_NO_OF_BLOCKS,
            persist_padding: false,
        }
    }

    /// Set the default block count. Zero is treated as one.
    pub fn with_default_no_of_blocks(mut self, no_of_blocks: u16) -> Self {
        self.default_no_of_blocks = no_of_blocks.max(1);
        self
    }

    /// Enable or disable persisting per-block padding bytes.
    pub fn with_persist_padding(mut self, persist_padding: bool) -> Self {
        self.persist_padding = persist_padding;
        self
    }
}

impl Default for BlockMemoryConfig {
    fn default() -> Self {
        Self::new()
    }
}
