/*!
 * Per-Call-Site Statistics
 * Fixed-size accounting table keyed by allocating call site
 */

use crate::core::limits::SITE_TABLE_SIZE;
use crate::core::types::Size;
use crate::memory::types::{CallSite, SiteUsage};
use ahash::AHashMap;

/// Slot shared by every site that arrives after the table is full
pub const OVERFLOW_SLOT: u16 = 0;

/// Accounting table
///
/// A site is mapped to a small index the first time it allocates and keeps
/// that index for the lifetime of the table.
#[derive(Debug, Clone)]
pub struct SiteTable {
    index: AHashMap<CallSite, u16>,
    slots: Vec<SiteUsage>,
    capacity: usize,
}

impl SiteTable {
    pub fn new() -> Self {
        Self::with_capacity(SITE_TABLE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, u16::MAX as usize + 1);
        let mut slots = Vec::with_capacity(capacity);
        slots.push(SiteUsage {
            index: OVERFLOW_SLOT,
            ..Default::default()
        });
        Self {
            index: AHashMap::new(),
            slots,
            capacity,
        }
    }

    /// Slot for a site, assigning one on first use
    pub fn index_of(&mut self, site: CallSite) -> u16 {
        if let Some(&idx) = self.index.get(&site) {
            return idx;
        }
        if self.slots.len() >= self.capacity {
            return OVERFLOW_SLOT;
        }
        let idx = self.slots.len() as u16;
        self.slots.push(SiteUsage {
            index: idx,
            site: Some(site),
            ..Default::default()
        });
        self.index.insert(site, idx);
        idx
    }

    pub fn is_assigned(&self, idx: u16) -> bool {
        (idx as usize) < self.slots.len()
    }

    pub fn slot(&self, idx: u16) -> Option<&SiteUsage> {
        self.slots.get(idx as usize)
    }

    pub fn record_alloc(&mut self, idx: u16, size: Size) {
        let slot = &mut self.slots[idx as usize];
        slot.allocations += 1;
        slot.live_bytes += size;
        slot.total_bytes += size as u64;
    }

    pub fn record_free(&mut self, idx: u16, size: Size) {
        let slot = &mut self.slots[idx as usize];
        slot.frees += 1;
        slot.live_bytes = slot.live_bytes.saturating_sub(size);
    }

    pub fn record_resize(&mut self, idx: u16, old: Size, new: Size) {
        let slot = &mut self.slots[idx as usize];
        if new >= old {
            slot.live_bytes += new - old;
            slot.total_bytes += (new - old) as u64;
        } else {
            slot.live_bytes = slot.live_bytes.saturating_sub(old - new);
        }
    }

    pub fn move_live(&mut self, from: u16, to: u16, size: Size) {
        let src = &mut self.slots[from as usize];
        src.live_bytes = src.live_bytes.saturating_sub(size);
        self.slots[to as usize].live_bytes += size;
    }

    /// Slots that ever allocated, ranked by live bytes then by total bytes
    pub fn top(&self, limit: usize) -> Vec<SiteUsage> {
        let mut ranked: Vec<SiteUsage> = self
            .slots
            .iter()
            .filter(|s| s.allocations > 0 || s.live_bytes > 0)
            .cloned()
            .collect();
        ranked.sort_by(|a, b| {
            b.live_bytes
                .cmp(&a.live_bytes)
                .then(b.total_bytes.cmp(&a.total_bytes))
                .then(a.index.cmp(&b.index))
        });
        ranked.truncate(limit);
        ranked
    }
}

impl Default for SiteTable {
    fn default() -> Self {
        Self::new()
    }
}
