/*!
 * Fragment Allocator
 *
 * Fast allocator over one caller-reserved region ("block").
 *
 * ## Layout
 *
 * The region is an address-ordered, gapless sequence of fragments. Each
 * fragment is a FRAG_OVERHEAD-byte header followed by its payload. The
 * header stores the fragment's slab slot and generation plus a check word;
 * the rest of the metadata lives in a dense slab indexed by slot.
 *
 * ## Free lists
 *
 * - **Exact buckets** (payload <= 16KB): one bucket per 8-byte step, any
 *   member fits, O(1) pop
 * - **Logarithmic buckets** (> 16KB): one bucket per power of two, kept
 *   sorted by size so first fit is the tightest fit
 * - **Bucket bitmap**: escalation jumps straight to the next non-empty class
 *
 * Every free fragment records the link slot that points at it, so removal
 * never walks a list.
 *
 * ## Coalescing
 *
 * Freed fragments merge with free physical neighbors immediately (at most
 * two merges), so no two free fragments are ever adjacent.
 */

mod allocator;
mod block;
mod bucket;
mod dealloc;
mod realloc;
mod size_class;
mod slab;
mod status;

pub use block::{DebugBlock, FastBlock, FragmentBlock};
pub use size_class::{bucket_bounds, bucket_index, round_up};

use crate::core::types::{Address, Size};
use crate::memory::instrument::Instrumentation;
use crate::memory::region::Region;
use crate::memory::select::MemoryBackend;
use crate::memory::traits::Allocator;
use crate::memory::types::{CallSite, MemInfo, MemStat, MemoryResult, SiteUsage, StatusReport};

// Implement trait interfaces
impl<I: Instrumentation, M: Region> Allocator for FragmentBlock<I, M> {
    fn name(&self) -> &str {
        FragmentBlock::name(self)
    }

    fn backend(&self) -> MemoryBackend {
        if I::VERIFY {
            MemoryBackend::FMallocDbg
        } else {
            MemoryBackend::FMalloc
        }
    }

    fn allocate(&mut self, size: Size, site: CallSite) -> MemoryResult<Address> {
        FragmentBlock::allocate(self, size, site)
    }

    fn reallocate(
        &mut self,
        address: Address,
        size: Size,
        site: CallSite,
    ) -> MemoryResult<Address> {
        FragmentBlock::reallocate(self, address, size, site)
    }

    fn deallocate(&mut self, address: Address, site: CallSite) -> MemoryResult<()> {
        FragmentBlock::deallocate(self, address, site)
    }

    fn info(&self) -> MemInfo {
        FragmentBlock::info(self)
    }

    fn status(&self) -> StatusReport {
        FragmentBlock::status(self)
    }

    fn set_large_limit(&mut self, limit: Size) {
        FragmentBlock::set_large_limit(self, limit)
    }

    fn get_stat(&self, stat: MemStat) -> Size {
        FragmentBlock::get_stat(self, stat)
    }

    fn payload(&self, address: Address) -> MemoryResult<&[u8]> {
        FragmentBlock::payload(self, address)
    }

    fn payload_mut(&mut self, address: Address) -> MemoryResult<&mut [u8]> {
        FragmentBlock::payload_mut(self, address)
    }

    fn site_report(&self, limit: usize) -> Vec<SiteUsage> {
        FragmentBlock::site_report(self, limit)
    }
}
