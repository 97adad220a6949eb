//! Integration tests: binary and hex file persistence.

use std::fs;

use blockmem::{
    BlockHeapMemory, BlockMemory, BlockMemoryConfig, BlockMemoryError, LinearHeapMemory,
};
use blockmem_test_utils::{assert_sequential, fill_sequential, FailingAllocator};

#[test]
fn binary_round_trip_into_different_block_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.bin");

    let mut mem = BlockHeapMemory::with_blocks(2048, 16).unwrap();
    fill_sequential(&mut mem);
    mem.save_to_file(&path).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 2048 * 4);

    let loaded: BlockHeapMemory<'_, u32> =
        BlockHeapMemory::from_file_with_blocks(&path, 5).unwrap();
    assert_eq!(loaded.no_of_blocks(), 5);
    assert_sequential(&loaded, 2048);
}

#[test]
fn load_into_populated_container_keeps_block_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.bin");

    let mut source = BlockHeapMemory::with_blocks(300, 3).unwrap();
    fill_sequential(&mut source);
    source.save_to_file(&path).unwrap();

    let mut target: BlockHeapMemory<'_, u32> = BlockHeapMemory::with_blocks(10, 6).unwrap();
    target.load_from_file(&path).unwrap();
    assert_eq!(target.no_of_blocks(), 6);
    assert_eq!(target.block_length(), 51);
    assert_sequential(&target, 300);
}

#[test]
fn trailing_partial_item_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("odd.bin");
    let mut bytes: Vec<u8> = (0u32..5).flat_map(u32::to_ne_bytes).collect();
    bytes.extend_from_slice(&[0xff; 3]);
    fs::write(&path, &bytes).unwrap();

    let mem = BlockHeapMemory::from_file(&path).unwrap();
    assert_sequential(&mem, 5);
}

#[test]
fn empty_file_loads_as_unallocated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.bin");
    fs::write(&path, b"").unwrap();

    let mut mem = BlockHeapMemory::<u32>::with_blocks(10, 2).unwrap();
    mem.load_from_file(&path).unwrap();
    assert!(mem.is_empty());
    assert!(!mem.is_allocated());
}

#[test]
fn padded_files_carry_block_padding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("padded.bin");

    let config = BlockMemoryConfig::default().with_persist_padding(true);
    let mut mem: BlockHeapMemory<'_, u32> = BlockHeapMemory::new().with_config(config);
    mem.allocate(10, 3).unwrap();
    fill_sequential(&mut mem);
    mem.save_to_file(&path).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 3 * 4 * 4);

    let loaded: BlockHeapMemory<'_, u32> = BlockHeapMemory::from_file(&path).unwrap();
    let expected: Vec<u32> = (0..10).chain([0, 0]).collect();
    assert_eq!(loaded.to_vec(), expected);
}

#[test]
fn missing_file_is_an_io_error_and_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut mem = BlockHeapMemory::with_blocks(40, 4).unwrap();
    fill_sequential(&mut mem);

    let err = mem.load_from_file(dir.path().join("missing.bin")).unwrap_err();
    assert!(matches!(err, BlockMemoryError::Io(_)));
    assert_sequential(&mem, 40);
}

#[test]
fn failed_reshape_during_load_keeps_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.bin");

    let alloc = FailingAllocator::new(4);
    let mut mem = BlockHeapMemory::with_blocks_in(100, 4, &alloc).unwrap();
    fill_sequential(&mut mem);
    mem.save_to_file(&path).unwrap();

    alloc.arm(0);
    let err = mem.load_from_file_with_blocks(&path, 5).unwrap_err();
    assert!(matches!(err, BlockMemoryError::AllocationFailure { .. }));
    assert_eq!(mem.no_of_blocks(), 4);
    assert_sequential(&mem, 100);
}

#[test]
fn failed_load_into_empty_container_keeps_pending_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.bin");
    fs::write(&path, [0u8; 64]).unwrap();

    let alloc = FailingAllocator::new(0);
    let mut mem: BlockHeapMemory<'_, u32> = BlockHeapMemory::with_allocator(&alloc);
    let err = mem.load_from_file_with_blocks(&path, 7).unwrap_err();
    assert!(matches!(err, BlockMemoryError::AllocationFailure { .. }));
    assert!(!mem.is_allocated());
    assert_eq!(mem.no_of_blocks(), 4);
    assert_eq!(alloc.live_allocations(), 0);
}

/// A directory opens like a file and reports a non-zero size, but every
/// read fails, so the load gets past preparation before erroring.
#[cfg(target_os = "linux")]
#[test]
fn failed_read_restores_length_and_block_count() {
    let dir = tempfile::tempdir().unwrap();
    let not_a_file = dir.path().join("not-a-file");
    fs::create_dir(&not_a_file).unwrap();
    for i in 0..10 {
        fs::write(not_a_file.join(format!("directory-entry-{i:02}.bin")), b"x").unwrap();
    }
    assert!(fs::metadata(&not_a_file).unwrap().len() >= 40 * 4);

    let mut mem = BlockHeapMemory::with_blocks(40, 4).unwrap();
    fill_sequential(&mut mem);

    let err = mem.load_from_file(&not_a_file).unwrap_err();
    assert!(matches!(err, BlockMemoryError::Io(_)));
    assert_eq!(mem.no_of_blocks(), 4);
    assert_eq!(mem.block_length(), 11);
    assert_sequential(&mem, 40);
}

#[test]
fn hex_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.hex");

    let mut mem = BlockHeapMemory::with_blocks(257, 9).unwrap();
    fill_sequential(&mut mem);
    mem.save_to_hex_file(&path).unwrap();
    assert_eq!(fs::read(&path).unwrap().len(), 257 * 4 * 2);

    let mut loaded: BlockHeapMemory<'_, u32> = BlockHeapMemory::new();
    loaded.load_from_hex_file_with_blocks(&path, 2).unwrap();
    assert_eq!(loaded.no_of_blocks(), 2);
    assert_sequential(&loaded, 257);
}

#[test]
fn hex_rendering_is_lowercase_item_bytes() {
    let mut mem: BlockHeapMemory<'_, u8> = BlockHeapMemory::with_blocks(3, 2).unwrap();
    mem[0] = 0xde;
    mem[1] = 0xad;
    mem[2] = 0x0f;
    assert_eq!(mem.to_hex(), "dead0f");
}

#[test]
fn hex_file_with_trailing_newline_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bytes.hex");
    fs::write(&path, "00010203fF\r\n").unwrap();

    let mut mem: BlockHeapMemory<'_, u8> = BlockHeapMemory::new();
    mem.load_from_hex_file(&path).unwrap();
    assert_eq!(mem.to_vec(), vec![0, 1, 2, 3, 0xff]);
}

#[test]
fn malformed_hex_file_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut mem = BlockHeapMemory::with_blocks(8, 2).unwrap();
    fill_sequential(&mut mem);

    for (name, content) in [("odd.hex", "000"), ("digit.hex", "0000000g")] {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        let err = mem.load_from_hex_file(&path).unwrap_err();
        assert!(matches!(err, BlockMemoryError::InvalidHex { .. }), "{name}");
        assert_sequential(&mem, 8);
    }
}

#[test]
fn linear_buffer_reads_segmented_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.bin");

    let mut mem = BlockHeapMemory::with_blocks(1000, 13).unwrap();
    fill_sequential(&mut mem);
    mem.save_to_file(&path).unwrap();

    let linear: LinearHeapMemory<'_, u32> = LinearHeapMemory::from_file(&path).unwrap();
    assert_eq!(linear.no_of_blocks(), 1);
    assert!(linear.iter().copied().eq(0..1000));
}
