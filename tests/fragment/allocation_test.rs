/*!
 * Allocation Tests
 * Reuse, exhaustion and resize behavior of the release block
 */

use fmalloc::core::limits::FRAG_OVERHEAD;
use fmalloc::memory::{heap_region, CallSite, FastBlock, MemStat, MemoryError};
use pretty_assertions::assert_eq;

const HERE: CallSite = CallSite::UNKNOWN;

#[test]
fn test_freed_fragment_is_reused() {
    let mut block = FastBlock::init(heap_region(65536), "pkg").unwrap();
    let a1 = block.allocate(100, HERE).unwrap();
    let a2 = block.allocate(200, HERE).unwrap();
    assert!(a2 >= a1 + 100, "A2 overlaps A1");

    block.deallocate(a1, HERE).unwrap();
    let again = block.allocate(100, HERE).unwrap();
    assert_eq!(again, a1);
}

#[test]
fn test_oversized_request_leaves_counters_unchanged() {
    let mut block = FastBlock::init(heap_region(65536), "pkg").unwrap();
    let a = block.allocate(1000, HERE).unwrap();
    block.allocate(5000, HERE).unwrap();
    block.deallocate(a, HERE).unwrap();

    let before = (block.info(), block.fragment_count());
    let err = block.allocate(65536, HERE).unwrap_err();
    assert!(matches!(err, MemoryError::OutOfMemory { requested: 65536, .. }));
    assert_eq!(before.0, block.info());
    assert_eq!(before.1, block.fragment_count());
}

#[test]
fn test_exhaust_then_recover() {
    let mut block = FastBlock::init(heap_region(8192), "shm").unwrap();
    let mut live = Vec::new();
    while let Ok(address) = block.allocate(256, HERE) {
        live.push(address);
    }
    assert!(live.len() >= 25);
    assert!(block.get_stat(MemStat::Free) < 256 + FRAG_OVERHEAD);

    for address in live {
        block.deallocate(address, HERE).unwrap();
    }
    let info = block.info();
    assert_eq!(info.used, 0);
    assert_eq!(info.total_frags, 0);
    assert_eq!(info.real_used, FRAG_OVERHEAD);
    assert_eq!(block.fragment_count(), 1);
}

#[test]
fn test_zero_size_allocation() {
    let mut block = FastBlock::init(heap_region(4096), "pkg").unwrap();
    let a = block.allocate(0, HERE).unwrap();
    let b = block.allocate(0, HERE).unwrap();
    assert_ne!(a, b);
    assert_eq!(block.usable_size(a).unwrap(), 8);
}

#[test]
fn test_realloc_keeps_contents_across_move() {
    let mut block = FastBlock::init(heap_region(65536), "pkg").unwrap();
    let a = block.allocate(64, HERE).unwrap();
    block.payload_mut(a).unwrap()[..64].copy_from_slice(&[7u8; 64]);
    // Pin the neighbor so growth has to move.
    let pin = block.allocate(64, HERE).unwrap();

    let moved = block.reallocate(a, 4000, HERE).unwrap();
    assert_ne!(moved, a);
    assert_eq!(&block.payload(moved).unwrap()[..64], &[7u8; 64][..]);
    assert!(block.payload(a).is_err());
    block.deallocate(pin, HERE).unwrap();
    block.deallocate(moved, HERE).unwrap();
    assert_eq!(block.fragment_count(), 1);
}

#[test]
fn test_realloc_in_place() {
    let mut block = FastBlock::init(heap_region(65536), "pkg").unwrap();
    let a = block.allocate(1000, HERE).unwrap();
    let grown = block.reallocate(a, 3000, HERE).unwrap();
    assert_eq!(grown, a);
    let shrunk = block.reallocate(a, 100, HERE).unwrap();
    assert_eq!(shrunk, a);
    assert_eq!(block.usable_size(a).unwrap(), 104);
    assert_eq!(block.info().used, 104);
}

#[test]
fn test_failed_realloc_keeps_original() {
    let mut block = FastBlock::init(heap_region(4096), "pkg").unwrap();
    let a = block.allocate(100, HERE).unwrap();
    block.allocate(100, HERE).unwrap();
    block.payload_mut(a).unwrap()[0] = 42;

    let err = block.reallocate(a, 10_000, HERE).unwrap_err();
    assert!(matches!(err, MemoryError::OutOfMemory { .. }));
    assert_eq!(block.payload(a).unwrap()[0], 42);
}

#[test]
fn test_large_allocations_use_sorted_buckets() {
    let mut block = FastBlock::init(heap_region(1 << 20), "shm").unwrap();
    let mut holes = Vec::new();
    for size in [40_000, 20_000, 30_000] {
        holes.push(block.allocate(size, HERE).unwrap());
        block.allocate(64, HERE).unwrap();
    }
    for hole in &holes {
        block.deallocate(*hole, HERE).unwrap();
    }
    // 20_000 and 30_000 share a bucket; the tighter one is picked first.
    assert_eq!(block.allocate(19_000, HERE).unwrap(), holes[1]);
    assert_eq!(block.allocate(25_000, HERE).unwrap(), holes[2]);
}

#[test]
fn test_region_too_small() {
    let err = FastBlock::init(heap_region(16), "pkg").unwrap_err();
    assert_eq!(err, MemoryError::RegionTooSmall { size: 16, required: 24 });
}

#[test]
fn test_static_region() {
    let region: &'static mut [u8] = Box::leak(vec![0u8; 4096].into_boxed_slice());
    let mut block = FastBlock::init(region, "static").unwrap();
    let a = block.allocate(128, HERE).unwrap();
    block.deallocate(a, HERE).unwrap();
}
