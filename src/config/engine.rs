//! Runtime tuning for the update cycle and background loop.
use std::time::Duration;

pub struct EngineConfig {
    /// Pause between background update cycles.
    pub update_interval: Duration,
    /// Dump the snapshot every N completed cycles.
    pub dump_every_cycles: u32,
    /// Upper bound on a single updater fetch.
    pub fetch_timeout: Duration,
}

pub const ENGINE: EngineConfig = EngineConfig {
    update_interval: Duration::from_secs(5 * 60),
    dump_every_cycles: 6,
    fetch_timeout: Duration::from_secs(60),
};
