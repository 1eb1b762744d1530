/*!
 * Memory Types
 * Common types for memory management
 */

use crate::core::types::{Address, Size};
use miette::Diagnostic;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Source location of the code that requested an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CallSite {
    pub file: &'static str,
    /// Enclosing module path
    pub module: &'static str,
    pub line: u32,
}

impl CallSite {
    /// Placeholder for callers that do not track their location
    pub const UNKNOWN: CallSite = CallSite {
        file: "<unknown>",
        module: "<unknown>",
        line: 0,
    };

    pub const fn new(file: &'static str, module: &'static str, line: u32) -> Self {
        Self { file, module, line }
    }
}

impl Default for CallSite {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}({})", self.file, self.module, self.line)
    }
}

/// Capture the current call site
///
/// Records the file, enclosing module path and line of the invocation.
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::memory::CallSite::new(file!(), module_path!(), line!())
    };
}

/// Memory errors
///
/// `DoubleFree` and `CorruptFragment` are fatal: they are detected before
/// the block is touched, and the pool layer aborts the process on them.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum MemoryError {
    #[error("Out of {block} memory: requested {requested} bytes, {available} bytes free")]
    #[diagnostic(
        code(memory::out_of_memory),
        help("Increase the block size; the block was left unchanged.")
    )]
    OutOfMemory {
        block: String,
        requested: Size,
        available: Size,
    },

    #[error("Region of {size} bytes cannot host an allocator (need at least {required})")]
    #[diagnostic(code(memory::region_too_small))]
    RegionTooSmall { size: Size, required: Size },

    #[error("Invalid {block} memory address: 0x{address:x}")]
    #[diagnostic(
        code(memory::invalid_address),
        help("The address was not returned by this block or was already released.")
    )]
    InvalidAddress { block: String, address: Address },

    #[error("freeing already freed {block} pointer (0x{address:x}), allocated at {alloc_site}, first free: {free_site}")]
    #[diagnostic(code(memory::double_free))]
    DoubleFree {
        block: String,
        address: Address,
        alloc_site: String,
        free_site: String,
    },

    #[error("Memory corruption detected in {block} fragment header at 0x{address:x}")]
    #[diagnostic(code(memory::corrupt_fragment))]
    CorruptFragment { block: String, address: Address },

    #[error("Memory allocator backend {0} is not built into this binary")]
    #[diagnostic(
        code(memory::backend_unavailable),
        help("Only the fragment allocator (F_MALLOC / F_MALLOC_DBG) is available.")
    )]
    BackendUnavailable(String),

    #[error("Memory allocator already selected as {selected}, cannot switch to {requested}")]
    #[diagnostic(code(memory::backend_already_selected))]
    BackendAlreadySelected { selected: String, requested: String },

    #[error("Invalid memory configuration: {0}")]
    #[diagnostic(code(memory::invalid_config))]
    InvalidConfig(String),
}

impl MemoryError {
    /// Whether continuing after this error risks corrupting the region
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MemoryError::DoubleFree { .. } | MemoryError::CorruptFragment { .. }
        )
    }
}

/// Administrative snapshot of a block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemInfo {
    pub total_size: Size,
    pub free: Size,
    pub used: Size,
    pub real_used: Size,
    pub max_used: Size,
    pub min_frag: Size,
    /// Fragments currently in use
    pub total_frags: Size,
    pub large_space: Size,
    pub large_limit: Size,
}

/// Single-number statistics exposed by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemStat {
    Size,
    Used,
    Free,
    RealUsed,
    MaxRealUsed,
    Fragments,
}

impl MemStat {
    pub const ALL: [MemStat; 6] = [
        MemStat::Size,
        MemStat::Used,
        MemStat::Free,
        MemStat::RealUsed,
        MemStat::MaxRealUsed,
        MemStat::Fragments,
    ];

    pub fn pick(self, info: &MemInfo) -> Size {
        match self {
            MemStat::Size => info.total_size,
            MemStat::Used => info.used,
            MemStat::Free => info.free,
            MemStat::RealUsed => info.real_used,
            MemStat::MaxRealUsed => info.max_used,
            MemStat::Fragments => info.total_frags,
        }
    }
}

/// One fragment in a status dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentReport {
    /// Payload address
    pub address: Address,
    pub size: Size,
    pub free: bool,
    pub alloc_site: Option<CallSite>,
    pub free_site: Option<CallSite>,
}

/// One non-empty bucket in a status dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketReport {
    pub index: usize,
    pub count: usize,
    /// Smallest size this bucket holds
    pub low: Size,
    /// Largest size this bucket holds
    pub high: Size,
}

/// Full diagnostic dump of a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub name: String,
    pub variant: &'static str,
    pub info: MemInfo,
    /// Every fragment in address order (empty unless the variant tracks sites)
    pub fragments: Vec<FragmentReport>,
    pub buckets: Vec<BucketReport>,
}

/// Usage accumulated by one call-site table slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteUsage {
    pub index: u16,
    /// `None` for the shared overflow slot
    pub site: Option<CallSite>,
    pub allocations: u64,
    pub frees: u64,
    pub live_bytes: Size,
    pub total_bytes: u64,
}
