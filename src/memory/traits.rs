/*!
 * Memory Traits
 * Uniform capability surface shared by every allocator backend
 */

use super::select::MemoryBackend;
use super::types::*;
use crate::core::types::{Address, Size};

/// Memory allocator interface
///
/// Every method assumes the caller holds exclusive access to the block.
/// The call site is threaded through each mutating call; backends without
/// debug tracking ignore it.
pub trait Allocator: Send {
    /// Name of the managed block
    fn name(&self) -> &str;

    /// Backend implementing this block
    fn backend(&self) -> MemoryBackend;

    /// Allocate at least `size` bytes
    fn allocate(&mut self, size: Size, site: CallSite) -> MemoryResult<Address>;

    /// Resize an allocation, possibly moving it
    fn reallocate(&mut self, address: Address, size: Size, site: CallSite)
        -> MemoryResult<Address>;

    /// Release an allocation
    fn deallocate(&mut self, address: Address, site: CallSite) -> MemoryResult<()>;

    /// Administrative snapshot
    fn info(&self) -> MemInfo;

    /// Full diagnostic dump
    fn status(&self) -> StatusReport;

    /// Threshold above which allocations count towards `large_space`
    fn set_large_limit(&mut self, limit: Size);

    /// Single summary statistic
    fn get_stat(&self, stat: MemStat) -> Size {
        stat.pick(&self.info())
    }

    /// Whether the backend keeps usage statistics
    fn has_stats(&self) -> bool {
        true
    }

    /// Payload bytes of a live allocation
    fn payload(&self, address: Address) -> MemoryResult<&[u8]>;

    fn payload_mut(&mut self, address: Address) -> MemoryResult<&mut [u8]>;

    /// Call sites ranked by live bytes, when the backend tracks them
    fn site_report(&self, _limit: usize) -> Vec<SiteUsage> {
        Vec::new()
    }
}
