/*!
 * Block Status
 * Read-only snapshots and diagnostic dumps
 */

use super::block::FragmentBlock;
use super::size_class::bucket_bounds;
use crate::core::limits::{FRAG_OVERHEAD, MIN_FRAG_SIZE};
use crate::core::types::Size;
use crate::memory::instrument::Instrumentation;
use crate::memory::region::Region;
use crate::memory::types::{
    BucketReport, CallSite, FragmentReport, MemInfo, MemStat, SiteUsage, StatusReport,
};
use log::info;

impl<I: Instrumentation, M: Region> FragmentBlock<I, M> {
    pub fn info(&self) -> MemInfo {
        MemInfo {
            total_size: self.size,
            free: self.size - self.real_used,
            used: self.used,
            real_used: self.real_used,
            max_used: self.max_real_used,
            min_frag: MIN_FRAG_SIZE,
            total_frags: self.fragments,
            large_space: self.large_space,
            large_limit: self.large_limit,
        }
    }

    pub fn get_stat(&self, stat: MemStat) -> Size {
        match stat {
            MemStat::Size => self.size,
            MemStat::Used => self.used,
            MemStat::Free => self.size - self.real_used,
            MemStat::RealUsed => self.real_used,
            MemStat::MaxRealUsed => self.max_real_used,
            MemStat::Fragments => self.fragments,
        }
    }

    /// Every fragment, free and allocated, in address order
    pub fn walk(&self) -> Vec<FragmentReport> {
        let mut frags = Vec::with_capacity(self.slab.len());
        let mut cur = Some(self.first);
        while let Some(id) = cur {
            let frag = self.slab.get(id);
            let (alloc_site, free_site) = I::sites(&frag.record);
            frags.push(FragmentReport {
                address: frag.offset + FRAG_OVERHEAD,
                size: frag.size,
                free: frag.free,
                alloc_site,
                free_site,
            });
            cur = frag.next_phys;
        }
        frags
    }

    /// Non-empty buckets with their member counts
    pub fn bucket_summary(&self) -> Vec<BucketReport> {
        self.hash
            .non_empty()
            .map(|index| {
                let (low, high) = bucket_bounds(index);
                BucketReport {
                    index,
                    count: self.hash.bucket(index).no,
                    low,
                    high,
                }
            })
            .collect()
    }

    /// Diagnostic dump, also written to the log
    ///
    /// The per-fragment walk is only included by variants that track call
    /// sites.
    pub fn status(&self) -> StatusReport {
        let report = StatusReport {
            name: self.name.clone(),
            variant: I::NAME,
            info: self.info(),
            fragments: if I::VERIFY { self.walk() } else { Vec::new() },
            buckets: self.bucket_summary(),
        };

        info!(
            "{} memory block status ({}): heap size = {}, used = {}, used+overhead = {}, free = {}, max used = {}, fragments in use = {}",
            report.name,
            report.variant,
            report.info.total_size,
            report.info.used,
            report.info.real_used,
            report.info.free,
            report.info.max_used,
            report.info.total_frags
        );
        let describe =
            |site: Option<CallSite>| site.map_or_else(|| "-".to_string(), |s| s.to_string());
        for (i, frag) in report.fragments.iter().enumerate() {
            info!(
                "    {:>5}. {} address = 0x{:x} size = {} alloc = {} free = {}",
                i,
                if frag.free { "free" } else { "used" },
                frag.address,
                frag.size,
                describe(frag.alloc_site),
                describe(frag.free_site)
            );
        }
        for bucket in &report.buckets {
            info!(
                "    bucket {:>4}: {:>5} fragments, sizes {} - {}",
                bucket.index, bucket.count, bucket.low, bucket.high
            );
        }
        report
    }

    /// Call sites ranked by live bytes (empty for the release variant)
    pub fn site_report(&self, limit: usize) -> Vec<SiteUsage> {
        self.instr.site_report(limit)
    }
}
