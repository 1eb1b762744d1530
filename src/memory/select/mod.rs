/*!
 * Allocator Selection
 *
 * Process-wide choice of the allocator backend plus the pool wrapper that
 * turns backend results into diagnostics. The backend is fixed once per
 * process, before any pool is created.
 */

mod backend;
mod oom;
mod pool;

pub use backend::MemoryBackend;
pub use oom::{oom_message, oom_nostats_message};
pub use pool::{MemoryPool, SharedPool};

use crate::memory::types::{MemoryError, MemoryResult};
use log::{info, warn};
use std::sync::OnceLock;

static SELECTED: OnceLock<MemoryBackend> = OnceLock::new();

/// Fix the process-wide backend
///
/// Selecting the already selected backend again is a no-op. Selecting a
/// different one, or one this binary does not carry, fails.
pub fn select_backend(backend: MemoryBackend) -> MemoryResult<MemoryBackend> {
    if !backend.is_available() {
        warn!("Memory allocator {} is not available in this build", backend);
        return Err(MemoryError::BackendUnavailable(backend.name().to_string()));
    }

    let selected = *SELECTED.get_or_init(|| {
        info!("Memory allocator {} selected", backend);
        backend
    });
    if selected != backend {
        return Err(MemoryError::BackendAlreadySelected {
            selected: selected.name().to_string(),
            requested: backend.name().to_string(),
        });
    }
    Ok(selected)
}

/// Backend in effect (the build default until one is selected)
pub fn selected_backend() -> MemoryBackend {
    SELECTED.get().copied().unwrap_or_else(MemoryBackend::build_default)
}
