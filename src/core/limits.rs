/*!
 * Allocator Limits and Constants
 *
 * Centralized location for the fragment allocator's sizing constants.
 * Performance-critical constants are marked with [PERF].
 */

// =============================================================================
// FRAGMENT GEOMETRY
// =============================================================================

/// Rounding granularity; every fragment size is a multiple of this (must be 2^n)
pub const ROUNDTO: usize = 8;

/// Smallest payload a free fragment may have
pub const MIN_FRAG_SIZE: usize = ROUNDTO;

/// Bytes reserved in the region in front of every payload
/// Holds the slot/generation word and the check word
pub const FRAG_OVERHEAD: usize = 16;

// =============================================================================
// SIZE CLASSES
// =============================================================================

/// log2 of the optimize threshold
pub const OPTIMIZE_FACTOR: u32 = 14;

/// Sizes up to this get one exact bucket per ROUNDTO step (16KB)
/// [PERF] Most allocations fall below this
pub const OPTIMIZE: usize = 1 << OPTIMIZE_FACTOR;

/// Bits in the size representation
pub const SIZE_BITS: u32 = usize::BITS;

/// Total bucket count: exact buckets + one per power of two above OPTIMIZE
pub const HASH_SIZE: usize = OPTIMIZE / ROUNDTO + (SIZE_BITS - OPTIMIZE_FACTOR) as usize + 1;

// =============================================================================
// INSTRUMENTATION
// =============================================================================

/// Check word pattern XORed into fragment headers
pub const FRAG_CHECK: u64 = 0xf0f0_f0f0_5a5a_5a5a;

/// Fixed capacity of the per-call-site accounting table
pub const SITE_TABLE_SIZE: usize = 256;

// =============================================================================
// DEFAULT BLOCK SIZES
// =============================================================================

/// Default private (pkg) block size (2MB)
pub const DEFAULT_PKG_SIZE: usize = 2 * 1024 * 1024;

/// Default shared (shm) block size (32MB)
pub const DEFAULT_SHM_SIZE: usize = 32 * 1024 * 1024;
