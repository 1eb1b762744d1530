/*!
 * Memory Module
 * Fragment allocator, instrumentation variants and backend selection
 */

pub mod config;
pub mod fragment;
pub mod instrument;
pub mod region;
pub mod select;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use config::{MemConfig, WarmupConfig};
pub use fragment::{DebugBlock, FastBlock, FragmentBlock};
pub use instrument::{DebugTracking, Instrumentation, Release};
pub use region::{heap_region, Region};
pub use select::{
    oom_message, oom_nostats_message, select_backend, selected_backend, MemoryBackend,
    MemoryPool, SharedPool,
};
pub use traits::*;
pub use types::*;
