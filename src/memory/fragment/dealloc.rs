/*!
 * Fragment Deallocation
 * Returning fragments to their buckets with neighbor coalescing
 */

use super::block::FragmentBlock;
use crate::core::limits::FRAG_OVERHEAD;
use crate::core::types::{Address, FragId};
use crate::memory::instrument::Instrumentation;
use crate::memory::region::Region;
use crate::memory::types::{CallSite, MemoryResult};
use log::debug;

impl<I: Instrumentation, M: Region> FragmentBlock<I, M> {
    /// Return an allocation to the block
    ///
    /// Double frees and header corruption are reported before anything is
    /// modified.
    pub fn deallocate(&mut self, address: Address, site: CallSite) -> MemoryResult<()> {
        let id = self.resolve(address)?;

        let frag = self.slab.get_mut(id);
        let size = frag.size;
        self.instr.on_free(&mut frag.record, site, size);

        self.fragments -= 1;
        self.used -= size;
        self.real_used -= size;
        if size > self.large_limit {
            self.large_space -= size;
        }

        self.release(id);
        debug!(
            "Deallocated {} bytes at 0x{:x} in {} block",
            size, address, self.name
        );
        Ok(())
    }

    /// Mark a fragment free, merge it with free neighbors and link the result
    pub(super) fn release(&mut self, id: FragId) {
        let mut id = id;
        if let Some(next) = self.slab.get(id).next_phys {
            if self.slab.get(next).free {
                self.hash.remove(&mut self.slab, next);
                self.absorb(id, next);
            }
        }
        if let Some(prev) = self.slab.get(id).prev_phys {
            if self.slab.get(prev).free {
                self.hash.remove(&mut self.slab, prev);
                self.absorb(prev, id);
                id = prev;
            }
        }

        self.slab.get_mut(id).free = true;
        self.hash.insert(&mut self.slab, id);
    }

    /// Fold the physically following fragment `gone` into `keep`
    ///
    /// `gone` must already be unlinked from its bucket.
    pub(super) fn absorb(&mut self, keep: FragId, gone: FragId) {
        let gone_frag = self.slab.remove(gone);
        debug_assert_eq!(gone_frag.prev_phys, Some(keep));
        {
            let frag = self.slab.get_mut(keep);
            frag.size += gone_frag.size + FRAG_OVERHEAD;
            frag.next_phys = gone_frag.next_phys;
        }
        match gone_frag.next_phys {
            Some(n) => self.slab.get_mut(n).prev_phys = Some(keep),
            None => self.last = keep,
        }
        self.real_used -= FRAG_OVERHEAD;
    }
}
