/*!
 * Memory Block
 * Block state, initialization and fragment header resolution
 */

use super::bucket::FreeHash;
use super::slab::{Fragment, Lookup, Slab};
use crate::core::limits::{FRAG_CHECK, FRAG_OVERHEAD, MIN_FRAG_SIZE, OPTIMIZE, ROUNDTO};
use crate::core::types::{Address, FragId, Size};
use crate::memory::instrument::{DebugTracking, Instrumentation, Release};
use crate::memory::region::{read_word, write_word, Region};
use crate::memory::types::{CallSite, MemoryError, MemoryResult};
use log::{info, warn};

/// One arena managed by the fragment allocator
///
/// All operations assume the caller holds exclusive access to the block.
pub struct FragmentBlock<I: Instrumentation = Release, M: Region = Box<[u8]>> {
    pub(super) name: String,
    pub(super) region: M,
    /// Usable span (region length rounded down to the granularity)
    pub(super) size: Size,
    pub(super) first: FragId,
    pub(super) last: FragId,
    pub(super) large_limit: Size,
    pub(super) large_space: Size,
    /// Fragments in use
    pub(super) fragments: Size,
    pub(super) used: Size,
    pub(super) real_used: Size,
    pub(super) max_real_used: Size,
    pub(super) slab: Slab<I::Record>,
    pub(super) hash: FreeHash,
    pub(super) instr: I,
}

/// Production block
pub type FastBlock<M = Box<[u8]>> = FragmentBlock<Release, M>;

/// Block with call-site tracking and double-free detection
pub type DebugBlock<M = Box<[u8]>> = FragmentBlock<DebugTracking, M>;

impl<I: Instrumentation, M: Region> FragmentBlock<I, M> {
    /// Carve `region` into a single free fragment
    pub fn init(region: M, name: impl Into<String>) -> MemoryResult<Self> {
        let name = name.into();
        let size = region.len() & !(ROUNDTO - 1);
        let required = FRAG_OVERHEAD + MIN_FRAG_SIZE;
        if size < required {
            warn!(
                "Cannot initialize {} memory block: {} bytes given, {} required",
                name,
                region.len(),
                required
            );
            return Err(MemoryError::RegionTooSmall {
                size: region.len(),
                required,
            });
        }

        let mut slab = Slab::new();
        let (id, generation) = slab.insert(Fragment::new(0, size - FRAG_OVERHEAD));
        let mut block = Self {
            name,
            region,
            size,
            first: id,
            last: id,
            large_limit: OPTIMIZE,
            large_space: 0,
            fragments: 0,
            used: 0,
            real_used: FRAG_OVERHEAD,
            max_real_used: FRAG_OVERHEAD,
            slab,
            hash: FreeHash::new(),
            instr: I::default(),
        };
        block.write_header(0, id, generation);
        block.slab.get_mut(id).free = true;
        block.hash.insert(&mut block.slab, id);

        info!(
            "{} memory block initialized with {} bytes ({} instrumentation)",
            block.name,
            block.size,
            I::NAME
        );
        Ok(block)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Usable span in bytes
    pub fn size(&self) -> Size {
        self.size
    }

    /// Allocations above this many bytes count as large
    ///
    /// `large_space` is recomputed over the live allocations.
    pub fn set_large_limit(&mut self, limit: Size) {
        self.large_limit = limit;
        let mut large = 0;
        let mut cur = Some(self.first);
        while let Some(id) = cur {
            let frag = self.slab.get(id);
            if !frag.free && frag.size > limit {
                large += frag.size;
            }
            cur = frag.next_phys;
        }
        self.large_space = large;
    }

    /// Number of fragments, free and allocated
    pub fn fragment_count(&self) -> usize {
        self.slab.len()
    }

    pub(super) fn write_header(&mut self, offset: Address, id: FragId, generation: u32) {
        let tag = ((generation as u64) << 32) | id as u64;
        let bytes = self.region.bytes_mut();
        write_word(bytes, offset, tag);
        write_word(bytes, offset + 8, tag ^ FRAG_CHECK);
    }

    fn invalid(&self, address: Address) -> MemoryError {
        MemoryError::InvalidAddress {
            block: self.name.clone(),
            address,
        }
    }

    fn double_free(&self, address: Address, record: Option<&I::Record>) -> MemoryError {
        let (alloc, free) = record.map_or((None, None), I::sites);
        let describe =
            |site: Option<CallSite>| site.map_or_else(|| "<unknown>".to_string(), |s| s.to_string());
        MemoryError::DoubleFree {
            block: self.name.clone(),
            address,
            alloc_site: describe(alloc),
            free_site: describe(free),
        }
    }

    /// Map a payload address back to its allocated fragment
    pub(super) fn resolve(&self, address: Address) -> MemoryResult<FragId> {
        if address < FRAG_OVERHEAD || address > self.size || address % ROUNDTO != 0 {
            return Err(self.invalid(address));
        }
        let offset = address - FRAG_OVERHEAD;
        let bytes = self.region.bytes();
        let tag = read_word(bytes, offset);
        if I::VERIFY && read_word(bytes, offset + 8) != tag ^ FRAG_CHECK {
            return Err(MemoryError::CorruptFragment {
                block: self.name.clone(),
                address,
            });
        }

        let id = tag as FragId;
        let generation = (tag >> 32) as u32;
        match self.slab.lookup(id, generation) {
            Lookup::Live(frag) if frag.offset == offset && !frag.free => Ok(id),
            Lookup::Live(frag) if frag.offset == offset && I::VERIFY => {
                Err(self.double_free(address, Some(&frag.record)))
            }
            Lookup::Stale(record) if I::VERIFY => Err(self.double_free(address, record)),
            _ => {
                warn!(
                    "Rejected invalid or already freed {} pointer 0x{:x}",
                    self.name, address
                );
                Err(self.invalid(address))
            }
        }
    }

    /// Allocated fragment capacity for a payload address
    pub fn usable_size(&self, address: Address) -> MemoryResult<Size> {
        let id = self.resolve(address)?;
        Ok(self.slab.get(id).size)
    }

    /// Payload bytes of an allocation (length = capacity)
    pub fn payload(&self, address: Address) -> MemoryResult<&[u8]> {
        let id = self.resolve(address)?;
        let size = self.slab.get(id).size;
        Ok(&self.region.bytes()[address..address + size])
    }

    pub fn payload_mut(&mut self, address: Address) -> MemoryResult<&mut [u8]> {
        let id = self.resolve(address)?;
        let size = self.slab.get(id).size;
        Ok(&mut self.region.bytes_mut()[address..address + size])
    }

    /// Accounting slot of a live allocation (debug variant only)
    pub fn stat_index(&self, address: Address) -> MemoryResult<Option<u16>> {
        let id = self.resolve(address)?;
        Ok(I::stat_index(&self.slab.get(id).record))
    }

    /// Charge a live allocation to another accounting slot
    ///
    /// Returns false when the variant has no table or the slot is unassigned.
    pub fn set_stat_index(&mut self, address: Address, index: u16) -> MemoryResult<bool> {
        let id = self.resolve(address)?;
        let frag = self.slab.get_mut(id);
        Ok(self.instr.set_stat_index(&mut frag.record, index, frag.size))
    }
}

impl<I: Instrumentation, M: Region> std::fmt::Debug for FragmentBlock<I, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentBlock")
            .field("name", &self.name)
            .field("variant", &I::NAME)
            .field("size", &self.size)
            .field("used", &self.used)
            .field("real_used", &self.real_used)
            .field("fragments", &self.fragments)
            .finish()
    }
}
