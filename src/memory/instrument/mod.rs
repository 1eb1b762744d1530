/*!
 * Allocator Instrumentation
 *
 * Two capability-compatible variants compiled into the fragment core:
 * - **Release**: no per-fragment record, no call-site tracking. Every hook
 *   is an empty inline function and the record is a zero-sized type.
 * - **Debug**: records the allocating and freeing call site of every
 *   fragment, verifies header check words, detects double frees and
 *   accumulates per-call-site usage in a fixed-size table.
 *
 * The variant is a type parameter of the block, so the release block pays
 * nothing for the hooks.
 */

mod debug;
mod release;
mod stats;

pub use debug::{DebugRecord, DebugTracking};
pub use release::Release;
pub use stats::SiteTable;

use super::types::{CallSite, SiteUsage};
use crate::core::types::Size;
use std::fmt;

/// Hooks the fragment core calls inline on every mutating operation
pub trait Instrumentation: Default + Send + 'static {
    /// Per-fragment record stored next to the fragment metadata
    type Record: Clone + Default + fmt::Debug + Send;

    /// Variant name shown in status dumps
    const NAME: &'static str;

    /// Verify header check words and report double frees as fatal
    const VERIFY: bool;

    fn on_alloc(&mut self, record: &mut Self::Record, site: CallSite, size: Size);

    fn on_free(&mut self, record: &mut Self::Record, site: CallSite, size: Size);

    /// Fragment changed capacity in place
    fn on_resize(&mut self, record: &mut Self::Record, site: CallSite, old: Size, new: Size);

    /// (allocating site, freeing site) recorded for a fragment
    fn sites(record: &Self::Record) -> (Option<CallSite>, Option<CallSite>);

    fn stat_index(record: &Self::Record) -> Option<u16>;

    /// Move a live fragment to another accounting slot
    fn set_stat_index(&mut self, record: &mut Self::Record, index: u16, size: Size) -> bool;

    /// Top `limit` accounting slots ranked by live bytes
    fn site_report(&self, limit: usize) -> Vec<SiteUsage>;
}
