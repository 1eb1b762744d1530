/*!
 * Fragment Allocation
 * First-fit bucket search and fragment splitting
 */

use super::block::FragmentBlock;
use super::size_class::round_up;
use super::slab::Fragment;
use crate::core::limits::{FRAG_OVERHEAD, MIN_FRAG_SIZE};
use crate::core::types::{Address, FragId, Size};
use crate::memory::instrument::Instrumentation;
use crate::memory::region::Region;
use crate::memory::types::{CallSite, MemoryError, MemoryResult};
use log::{debug, error};

impl<I: Instrumentation, M: Region> FragmentBlock<I, M> {
    pub(super) fn out_of_memory(&self, requested: Size) -> MemoryError {
        MemoryError::OutOfMemory {
            block: self.name.clone(),
            requested,
            available: self.size - self.real_used,
        }
    }

    /// Allocate at least `size` bytes
    ///
    /// On failure the block is left untouched.
    pub fn allocate(&mut self, size: Size, site: CallSite) -> MemoryResult<Address> {
        let Some(rounded) = round_up(size) else {
            error!("{} allocation of {} bytes overflows", self.name, size);
            return Err(self.out_of_memory(size));
        };
        let Some(id) = self.hash.find(&self.slab, rounded) else {
            error!(
                "OOM: {} block cannot fit {} bytes ({} bytes free in {} fragments)",
                self.name,
                rounded,
                self.size - self.real_used,
                self.slab.len() - self.fragments
            );
            return Err(self.out_of_memory(size));
        };

        self.hash.remove(&mut self.slab, id);
        self.slab.get_mut(id).free = false;
        self.split(id, rounded);

        let frag = self.slab.get_mut(id);
        let got = frag.size;
        let address = frag.offset + FRAG_OVERHEAD;
        self.instr.on_alloc(&mut frag.record, site, got);

        self.fragments += 1;
        self.used += got;
        self.real_used += got;
        self.max_real_used = self.max_real_used.max(self.real_used);
        if got > self.large_limit {
            self.large_space += got;
        }

        debug!(
            "Allocated {} bytes ({} requested) at 0x{:x} in {} block",
            got, size, address, self.name
        );
        Ok(address)
    }

    /// Shrink an unlinked fragment to `size`, freeing the remainder
    ///
    /// Returns false when the remainder is too small to form a fragment; the
    /// whole fragment is then kept.
    pub(super) fn split(&mut self, id: FragId, size: Size) -> bool {
        let (offset, rest, next) = {
            let frag = self.slab.get(id);
            debug_assert!(!frag.free);
            debug_assert!(frag.size >= size);
            (frag.offset, frag.size - size, frag.next_phys)
        };
        if rest < FRAG_OVERHEAD + MIN_FRAG_SIZE {
            return false;
        }

        let tail_offset = offset + FRAG_OVERHEAD + size;
        let mut tail = Fragment::new(tail_offset, rest - FRAG_OVERHEAD);
        tail.prev_phys = Some(id);
        tail.next_phys = next;
        let (tail_id, generation) = self.slab.insert(tail);
        self.write_header(tail_offset, tail_id, generation);

        {
            let frag = self.slab.get_mut(id);
            frag.size = size;
            frag.next_phys = Some(tail_id);
        }
        match next {
            Some(n) => self.slab.get_mut(n).prev_phys = Some(tail_id),
            None => self.last = tail_id,
        }
        self.real_used += FRAG_OVERHEAD;

        self.release(tail_id);
        true
    }
}
