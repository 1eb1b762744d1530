/*!
 * Release Instrumentation
 * No-op hooks for production blocks
 */

use super::Instrumentation;
use crate::core::types::Size;
use crate::memory::types::{CallSite, SiteUsage};

#[derive(Debug, Default, Clone, Copy)]
pub struct Release;

impl Instrumentation for Release {
    type Record = ();

    const NAME: &'static str = "release";
    const VERIFY: bool = false;

    #[inline(always)]
    fn on_alloc(&mut self, _record: &mut (), _site: CallSite, _size: Size) {}

    #[inline(always)]
    fn on_free(&mut self, _record: &mut (), _site: CallSite, _size: Size) {}

    #[inline(always)]
    fn on_resize(&mut self, _record: &mut (), _site: CallSite, _old: Size, _new: Size) {}

    #[inline(always)]
    fn sites(_record: &()) -> (Option<CallSite>, Option<CallSite>) {
        (None, None)
    }

    #[inline(always)]
    fn stat_index(_record: &()) -> Option<u16> {
        None
    }

    fn set_stat_index(&mut self, _record: &mut (), _index: u16, _size: Size) -> bool {
        false
    }

    fn site_report(&self, _limit: usize) -> Vec<SiteUsage> {
        Vec::new()
    }
}
