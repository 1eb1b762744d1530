/*!
 * Fragment Reallocation
 * In-place shrink, merge-forward growth and move fallback
 */

use super::block::FragmentBlock;
use super::size_class::round_up;
use crate::core::limits::FRAG_OVERHEAD;
use crate::core::types::{Address, FragId, Size};
use crate::memory::instrument::Instrumentation;
use crate::memory::region::Region;
use crate::memory::types::{CallSite, MemoryResult};
use log::debug;

impl<I: Instrumentation, M: Region> FragmentBlock<I, M> {
    /// Resize an allocation, keeping its contents
    ///
    /// Shrinking and in-place growth keep the address. When the allocation
    /// has to move and no fragment fits, the original stays valid.
    pub fn reallocate(
        &mut self,
        address: Address,
        size: Size,
        site: CallSite,
    ) -> MemoryResult<Address> {
        let id = self.resolve(address)?;
        let Some(rounded) = round_up(size) else {
            return Err(self.out_of_memory(size));
        };
        let old = self.slab.get(id).size;

        if old >= rounded {
            if self.split(id, rounded) {
                self.account_resize(id, old, site);
                debug!(
                    "Shrunk {} block allocation at 0x{:x} from {} to {} bytes",
                    self.name, address, old, rounded
                );
            }
            return Ok(address);
        }

        if self.grow_in_place(id, rounded - old) {
            self.split(id, rounded);
            self.account_resize(id, old, site);
            debug!(
                "Grew {} block allocation at 0x{:x} in place from {} to {} bytes",
                self.name,
                address,
                old,
                self.slab.get(id).size
            );
            return Ok(address);
        }

        let moved = self.allocate(size, site)?;
        self.region
            .bytes_mut()
            .copy_within(address..address + old, moved);
        self.deallocate(address, site)?;
        debug!(
            "Moved {} block allocation from 0x{:x} to 0x{:x} ({} -> {} bytes)",
            self.name, address, moved, old, rounded
        );
        Ok(moved)
    }

    /// Absorb the next fragment if it is free and covers `deficit` bytes
    fn grow_in_place(&mut self, id: FragId, deficit: Size) -> bool {
        let Some(next) = self.slab.get(id).next_phys else {
            return false;
        };
        let candidate = self.slab.get(next);
        if !candidate.free || candidate.size + FRAG_OVERHEAD < deficit {
            return false;
        }
        self.hash.remove(&mut self.slab, next);
        self.absorb(id, next);
        true
    }

    /// Re-account an allocated fragment whose capacity changed from `old`
    fn account_resize(&mut self, id: FragId, old: Size, site: CallSite) {
        let frag = self.slab.get_mut(id);
        let new = frag.size;
        self.instr.on_resize(&mut frag.record, site, old, new);

        self.used = self.used + new - old;
        self.real_used = self.real_used + new - old;
        self.max_real_used = self.max_real_used.max(self.real_used);
        if old > self.large_limit {
            self.large_space -= old;
        }
        if new > self.large_limit {
            self.large_space += new;
        }
    }
}
