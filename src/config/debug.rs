//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Per-family counts produced by each lengthen pass.
    pub log_lengthen: bool,

    /// Cache hits, misses and invalidations.
    pub log_cache: bool,

    /// Step-by-step progress of the update orchestrator.
    pub log_updates: bool,

    pub log_persistence: bool,

    /// Activate trace_time macro (for scope-level timing)
    pub log_performance: bool,
}

pub const DF: LogFlags = LogFlags {
    log_lengthen: false,
    log_cache: false,
    log_updates: true,
    log_persistence: true,
    log_performance: false,
};
