/*!
 * Allocator Backends
 * Enumeration of the allocator implementations behind the common surface
 */

use crate::memory::fragment::{DebugBlock, FastBlock};
use crate::memory::region::Region;
use crate::memory::traits::Allocator;
use crate::memory::types::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Allocator backend
///
/// Only the fragment allocator is built into this crate; the quick-fit and
/// high-performance backends are recognised so configurations naming them
/// fail with a clear error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryBackend {
    #[serde(rename = "F_MALLOC")]
    FMalloc,
    #[serde(rename = "Q_MALLOC")]
    QMalloc,
    #[serde(rename = "HP_MALLOC")]
    HpMalloc,
    #[serde(rename = "F_MALLOC_DBG")]
    FMallocDbg,
    #[serde(rename = "Q_MALLOC_DBG")]
    QMallocDbg,
    #[serde(rename = "HP_MALLOC_DBG")]
    HpMallocDbg,
}

impl MemoryBackend {
    pub const ALL: [MemoryBackend; 6] = [
        MemoryBackend::FMalloc,
        MemoryBackend::QMalloc,
        MemoryBackend::HpMalloc,
        MemoryBackend::FMallocDbg,
        MemoryBackend::QMallocDbg,
        MemoryBackend::HpMallocDbg,
    ];

    /// Backend chosen by the build features
    pub const fn build_default() -> Self {
        if cfg!(feature = "dbg-malloc") {
            MemoryBackend::FMallocDbg
        } else {
            MemoryBackend::FMalloc
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            MemoryBackend::FMalloc => "F_MALLOC",
            MemoryBackend::QMalloc => "Q_MALLOC",
            MemoryBackend::HpMalloc => "HP_MALLOC",
            MemoryBackend::FMallocDbg => "F_MALLOC_DBG",
            MemoryBackend::QMallocDbg => "Q_MALLOC_DBG",
            MemoryBackend::HpMallocDbg => "HP_MALLOC_DBG",
        }
    }

    pub const fn is_debug(self) -> bool {
        matches!(
            self,
            MemoryBackend::FMallocDbg | MemoryBackend::QMallocDbg | MemoryBackend::HpMallocDbg
        )
    }

    /// Whether this binary carries the backend's implementation
    pub const fn is_available(self) -> bool {
        matches!(self, MemoryBackend::FMalloc | MemoryBackend::FMallocDbg)
    }

    /// Build a block of this backend over `region`
    pub fn create<M: Region + 'static>(
        self,
        region: M,
        name: &str,
    ) -> MemoryResult<Box<dyn Allocator>> {
        match self {
            MemoryBackend::FMalloc => Ok(Box::new(FastBlock::init(region, name)?)),
            MemoryBackend::FMallocDbg => Ok(Box::new(DebugBlock::init(region, name)?)),
            other => Err(MemoryError::BackendUnavailable(other.name().to_string())),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::build_default()
    }
}

impl fmt::Display for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MemoryBackend {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        MemoryBackend::ALL
            .into_iter()
            .find(|b| b.name() == wanted)
            .ok_or_else(|| MemoryError::InvalidConfig(format!("unknown memory allocator '{s}'")))
    }
}
