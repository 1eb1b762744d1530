/*!
 * Memory Pool
 * Named pool over the selected backend with OOM diagnostics and fatal escalation
 */

use super::oom::{oom_message, oom_nostats_message};
use super::{selected_backend, MemoryBackend};
use crate::core::types::{Address, Size};
use crate::memory::region::Region;
use crate::memory::traits::Allocator;
use crate::memory::types::{
    CallSite, MemInfo, MemStat, MemoryError, MemoryResult, SiteUsage, StatusReport,
};
use log::error;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Pool guarded for callers that share it across threads
pub type SharedPool = Arc<Mutex<MemoryPool>>;

/// A memory block plus the naming used in operator-facing diagnostics
///
/// `kind` names the memory ("pkg", "shm") and `flag` the command-line switch
/// that sizes it. Double frees and corrupted headers abort the process.
pub struct MemoryPool {
    kind: String,
    flag: String,
    inner: Box<dyn Allocator>,
}

impl MemoryPool {
    /// Create a pool through the process-wide backend
    pub fn new<M: Region + 'static>(
        kind: &str,
        flag: &str,
        region: M,
        name: &str,
    ) -> MemoryResult<Self> {
        Self::with_backend(selected_backend(), kind, flag, region, name)
    }

    pub fn with_backend<M: Region + 'static>(
        backend: MemoryBackend,
        kind: &str,
        flag: &str,
        region: M,
        name: &str,
    ) -> MemoryResult<Self> {
        let inner = backend.create(region, name)?;
        Ok(Self::from_allocator(kind, flag, inner))
    }

    pub fn from_allocator(kind: &str, flag: &str, inner: Box<dyn Allocator>) -> Self {
        Self {
            kind: kind.to_string(),
            flag: flag.to_string(),
            inner,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn backend(&self) -> MemoryBackend {
        self.inner.backend()
    }

    pub fn allocate(&mut self, size: Size, site: CallSite) -> MemoryResult<Address> {
        let result = self.inner.allocate(size, site);
        self.report(result, size)
    }

    pub fn reallocate(
        &mut self,
        address: Address,
        size: Size,
        site: CallSite,
    ) -> MemoryResult<Address> {
        let result = self.inner.reallocate(address, size, site);
        self.report(result, size)
    }

    pub fn deallocate(&mut self, address: Address, site: CallSite) -> MemoryResult<()> {
        let result = self.inner.deallocate(address, site);
        self.escalate(result)
    }

    pub fn info(&self) -> MemInfo {
        self.inner.info()
    }

    pub fn status(&self) -> StatusReport {
        self.inner.status()
    }

    pub fn set_large_limit(&mut self, limit: Size) {
        self.inner.set_large_limit(limit);
    }

    pub fn get_stat(&self, stat: MemStat) -> Size {
        self.inner.get_stat(stat)
    }

    pub fn has_stats(&self) -> bool {
        self.inner.has_stats()
    }

    pub fn site_report(&self, limit: usize) -> Vec<SiteUsage> {
        self.inner.site_report(limit)
    }

    pub fn payload(&self, address: Address) -> MemoryResult<&[u8]> {
        self.inner.payload(address)
    }

    pub fn payload_mut(&mut self, address: Address) -> MemoryResult<&mut [u8]> {
        self.inner.payload_mut(address)
    }

    pub fn into_shared(self) -> SharedPool {
        Arc::new(Mutex::new(self))
    }

    /// Diagnostic logged when a request of `need` bytes cannot be served
    pub fn oom_diagnostic(&self, need: Size) -> String {
        if self.inner.has_stats() {
            oom_message(&self.kind, self.inner.get_stat(MemStat::Free), need, &self.flag)
        } else {
            oom_nostats_message(&self.kind, need, &self.flag)
        }
    }

    fn report(&self, result: MemoryResult<Address>, need: Size) -> MemoryResult<Address> {
        if let Err(MemoryError::OutOfMemory { .. }) = &result {
            error!("{}", self.oom_diagnostic(need));
        }
        self.escalate(result)
    }

    fn escalate<T>(&self, result: MemoryResult<T>) -> MemoryResult<T> {
        match result {
            Err(err) if err.is_fatal() => {
                error!("{}", err);
                std::process::abort();
            }
            other => other,
        }
    }
}

impl fmt::Debug for MemoryPool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemoryPool")
            .field("kind", &self.kind)
            .field("flag", &self.flag)
            .field("name", &self.inner.name())
            .field("backend", &self.inner.backend())
            .finish()
    }
}

/// Allocate from a pool, recording the caller's location
#[macro_export]
macro_rules! pool_malloc {
    ($pool:expr, $size:expr) => {
        $pool.allocate($size, $crate::call_site!())
    };
}

/// Resize an allocation, recording the caller's location
#[macro_export]
macro_rules! pool_realloc {
    ($pool:expr, $address:expr, $size:expr) => {
        $pool.reallocate($address, $size, $crate::call_site!())
    };
}

/// Free an allocation, recording the caller's location
#[macro_export]
macro_rules! pool_free {
    ($pool:expr, $address:expr) => {
        $pool.deallocate($address, $crate::call_site!())
    };
}
