/*!
 * Fragment Memory Allocator
 * Fast fragment allocator over caller-reserved memory regions
 */

#[cfg(not(feature = "f-malloc"))]
compile_error!("no memory allocator selected");

pub mod core;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use memory::{
    select_backend, selected_backend, Allocator, CallSite, DebugBlock, FastBlock, MemConfig,
    MemInfo, MemStat, MemoryBackend, MemoryError, MemoryPool, MemoryResult, SharedPool,
};
pub use monitoring::init_tracing;
