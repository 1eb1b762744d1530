/*!
 * Invariant Tests
 * Partition and accounting invariants over random operation sequences
 */

use fmalloc::core::limits::FRAG_OVERHEAD;
use fmalloc::memory::{
    heap_region, CallSite, DebugBlock, FastBlock, FragmentBlock, Instrumentation,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Alloc(usize),
    Free(usize),
    Realloc(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..3000).prop_map(Op::Alloc),
        1 => (16_000usize..40_000).prop_map(Op::Alloc),
        3 => any::<usize>().prop_map(Op::Free),
        2 => (any::<usize>(), 0usize..6000).prop_map(|(i, s)| Op::Realloc(i, s)),
    ]
}

/// Walk the block and check everything that must hold between operations
fn check<I: Instrumentation>(block: &FragmentBlock<I>, live: &[(usize, usize, u8)]) {
    let frags = block.walk();
    let info = block.info();

    let mut expected = FRAG_OVERHEAD;
    let mut free_payload = 0;
    let mut used_payload = 0;
    let mut in_use = 0;
    for (i, frag) in frags.iter().enumerate() {
        assert_eq!(frag.address, expected, "gap or overlap before fragment {i}");
        expected = frag.address + frag.size + FRAG_OVERHEAD;
        if frag.free {
            free_payload += frag.size;
            if let Some(next) = frags.get(i + 1) {
                assert!(!next.free, "adjacent free fragments at 0x{:x}", frag.address);
            }
        } else {
            used_payload += frag.size;
            in_use += 1;
        }
    }
    assert_eq!(expected - FRAG_OVERHEAD, block.size(), "fragments do not cover the block");
    assert_eq!(info.free, free_payload);
    assert_eq!(info.used, used_payload);
    assert_eq!(info.total_frags, in_use);
    assert_eq!(info.total_frags, live.len());
    assert!(info.max_used >= info.real_used);

    for &(address, len, tag) in live {
        let payload = block.payload(address).unwrap();
        assert!(payload.len() >= len);
        assert!(payload[..len].iter().all(|&b| b == tag), "payload at 0x{address:x} clobbered");
    }
}

fn run<I: Instrumentation>(mut block: FragmentBlock<I>, ops: Vec<Op>) {
    let site = CallSite::new("invariant_test.rs", "run", 1);
    let mut live: Vec<(usize, usize, u8)> = Vec::new();
    let mut tag = 0u8;

    for op in ops {
        match op {
            Op::Alloc(size) => {
                if let Ok(address) = block.allocate(size, site) {
                    tag = tag.wrapping_add(1);
                    block.payload_mut(address).unwrap()[..size].fill(tag);
                    live.push((address, size, tag));
                }
            }
            Op::Free(pick) if !live.is_empty() => {
                let (address, _, _) = live.swap_remove(pick % live.len());
                block.deallocate(address, site).unwrap();
            }
            Op::Realloc(pick, size) if !live.is_empty() => {
                let idx = pick % live.len();
                let (address, len, t) = live[idx];
                if let Ok(moved) = block.reallocate(address, size, site) {
                    let kept = len.min(size);
                    live[idx] = (moved, kept, t);
                }
            }
            _ => {}
        }
        check(&block, &live);
    }

    for (address, _, _) in live.drain(..) {
        block.deallocate(address, site).unwrap();
    }
    check(&block, &live);
    assert_eq!(block.fragment_count(), 1);
    assert_eq!(block.info().real_used, FRAG_OVERHEAD);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_release_block_invariants(ops in prop::collection::vec(op(), 1..120)) {
        run(FastBlock::init(heap_region(256 * 1024), "pkg").unwrap(), ops);
    }

    #[test]
    fn prop_debug_block_invariants(ops in prop::collection::vec(op(), 1..120)) {
        run(DebugBlock::init(heap_region(256 * 1024), "shm").unwrap(), ops);
    }
}
