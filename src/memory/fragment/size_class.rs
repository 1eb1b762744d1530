/*!
 * Size Classes
 * Bucket index computation for free fragments
 *
 * Buckets 0 ..= OPTIMIZE/ROUNDTO hold exactly one size each (index * ROUNDTO).
 * Buckets above that hold [2^k, 2^(k+1)) for k > OPTIMIZE_FACTOR - 1.
 */

use crate::core::limits::{HASH_SIZE, MIN_FRAG_SIZE, OPTIMIZE, OPTIMIZE_FACTOR, ROUNDTO};
use crate::core::types::{BucketIdx, Size};

/// Round a request up to the granularity, never below the minimum fragment
#[inline]
pub fn round_up(size: Size) -> Option<Size> {
    let size = size.max(MIN_FRAG_SIZE);
    size.checked_add(ROUNDTO - 1).map(|s| s & !(ROUNDTO - 1))
}

/// Floor log2 of a non-zero size
#[inline]
fn big_hash_idx(size: Size) -> usize {
    (usize::BITS - 1 - size.leading_zeros()) as usize
}

/// Bucket a fragment of `size` bytes belongs to
#[inline]
pub fn bucket_index(size: Size) -> BucketIdx {
    if size <= OPTIMIZE {
        size / ROUNDTO
    } else {
        OPTIMIZE / ROUNDTO + big_hash_idx(size) - OPTIMIZE_FACTOR as usize + 1
    }
}

/// Whether every fragment in the bucket is guaranteed to fit `size`
#[inline]
pub fn is_exact(idx: BucketIdx) -> bool {
    idx <= OPTIMIZE / ROUNDTO
}

/// Smallest and largest size a bucket can hold
pub fn bucket_bounds(idx: BucketIdx) -> (Size, Size) {
    debug_assert!(idx < HASH_SIZE);
    if is_exact(idx) {
        let size = idx * ROUNDTO;
        (size, size)
    } else {
        let exp = idx - OPTIMIZE / ROUNDTO + OPTIMIZE_FACTOR as usize - 1;
        let low = 1usize << exp;
        let high = low.checked_mul(2).map_or(Size::MAX, |h| h - 1);
        (low.max(OPTIMIZE + ROUNDTO), high)
    }
}
