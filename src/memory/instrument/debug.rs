/*!
 * Debug Instrumentation
 * Call-site tracking, double-free detection and per-site accounting
 */

use super::stats::SiteTable;
use super::Instrumentation;
use crate::core::types::Size;
use crate::memory::types::{CallSite, SiteUsage};

/// Per-fragment debug record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugRecord {
    pub alloc_site: Option<CallSite>,
    pub free_site: Option<CallSite>,
    pub stat_index: u16,
}

#[derive(Debug, Default, Clone)]
pub struct DebugTracking {
    table: SiteTable,
}

impl DebugTracking {
    pub fn table(&self) -> &SiteTable {
        &self.table
    }
}

impl Instrumentation for DebugTracking {
    type Record = DebugRecord;

    const NAME: &'static str = "debug";
    const VERIFY: bool = true;

    fn on_alloc(&mut self, record: &mut DebugRecord, site: CallSite, size: Size) {
        let idx = self.table.index_of(site);
        self.table.record_alloc(idx, size);
        *record = DebugRecord {
            alloc_site: Some(site),
            free_site: None,
            stat_index: idx,
        };
    }

    fn on_free(&mut self, record: &mut DebugRecord, site: CallSite, size: Size) {
        self.table.record_free(record.stat_index, size);
        record.free_site = Some(site);
    }

    fn on_resize(&mut self, record: &mut DebugRecord, _site: CallSite, old: Size, new: Size) {
        self.table.record_resize(record.stat_index, old, new);
    }

    fn sites(record: &DebugRecord) -> (Option<CallSite>, Option<CallSite>) {
        (record.alloc_site, record.free_site)
    }

    fn stat_index(record: &DebugRecord) -> Option<u16> {
        Some(record.stat_index)
    }

    fn set_stat_index(&mut self, record: &mut DebugRecord, index: u16, size: Size) -> bool {
        if !self.table.is_assigned(index) {
            return false;
        }
        self.table.move_live(record.stat_index, index, size);
        record.stat_index = index;
        true
    }

    fn site_report(&self, limit: usize) -> Vec<SiteUsage> {
        self.table.top(limit)
    }
}
