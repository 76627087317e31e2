//! Configuration module for the chart engine.

// Can all be private now because we have a public re-export.
mod debug;
mod engine;
mod persistence;

// Public
pub mod constants;

// Re-export commonly used items
pub use debug::{DF, LogFlags};
pub use engine::{ENGINE, EngineConfig};
pub use persistence::{
    CACHE_VERSION, PERSISTENCE, PersistenceConfig, family_cache_filename, snapshot_filename,
};

/// Gate for the `trace_time!` macro.
pub const LOG_PERFORMANCE: bool = DF.log_performance;
