/*!
 * Core Types
 * Common types used across the allocator
 */

/// Address type for memory operations
///
/// Addresses are byte offsets into the block's region, so they stay valid
/// in every process that maps the same region at a different base.
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Index of a fragment slot in a block's fragment slab
pub type FragId = u32;

/// Index of a free-list bucket
pub type BucketIdx = usize;
