//! Criterion micro-benchmarks for binary and hex persistence.

use std::hint::black_box;

use blockmem::{BlockHeapMemory, BlockMemory};
use blockmem_bench::{reference_profile, sequential_container};
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_binary(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.bin");
    let mem = sequential_container(reference_profile()).unwrap();

    c.bench_function("save_binary_64k", |b| {
        b.iter(|| mem.save_to_file(&path).unwrap());
    });

    mem.save_to_file(&path).unwrap();
    let mut target: BlockHeapMemory<'_, u32> = BlockHeapMemory::new();
    c.bench_function("load_binary_64k", |b| {
        b.iter(|| {
            target.load_from_file(&path).unwrap();
            black_box(target.length())
        });
    });
}

fn bench_hex(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.hex");
    let mem = sequential_container(reference_profile()).unwrap();

    c.bench_function("to_hex_64k", |b| {
        b.iter(|| black_box(mem.to_hex()));
    });

    mem.save_to_hex_file(&path).unwrap();
    let mut target: BlockHeapMemory<'_, u32> = BlockHeapMemory::new();
    c.bench_function("load_hex_64k", |b| {
        b.iter(|| {
            target.load_from_hex_file(&path).unwrap();
            black_box(target.length())
        });
    });
}

criterion_group!(benches, bench_binary, bench_hex);
criterion_main!(benches);
