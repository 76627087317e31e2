//! File persistence and serialization configuration
use crate::domain::{BinLevel, Family};

/// Semantic version written into every snapshot and family file.
/// Bump whenever a serialized series set changes shape.
pub const CACHE_VERSION: &str = "1.0.0";

/// Configuration for the whole-engine snapshot
pub struct SnapshotPersistenceConfig {
    /// Directory path for storing snapshots
    pub directory: &'static str,
    /// Base filename for snapshot files (without extension)
    pub filename_base: &'static str,
}

/// Configuration for the per-family cache files
pub struct FamilyPersistenceConfig {
    pub directory: &'static str,
    /// Exchange keys contain `/` in the pair name; replaced with this in file names.
    pub slash_replacement: &'static str,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    pub snapshot: SnapshotPersistenceConfig,
    pub families: FamilyPersistenceConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    snapshot: SnapshotPersistenceConfig {
        directory: "chart_data",
        filename_base: "charts",
    },
    families: FamilyPersistenceConfig {
        directory: "chart_data/families",
        slash_replacement: "--",
    },
};

/// Example: "charts_v1.0.0.bin"
pub fn snapshot_filename() -> String {
    format!(
        "{}_v{}.bin",
        PERSISTENCE.snapshot.filename_base, CACHE_VERSION
    )
}

/// Example: "pow-hour.bin", "exchange-binance-BTC--USDT-3600-day.bin"
pub fn family_cache_filename(family: Family, bin: BinLevel, key: Option<&str>) -> String {
    match key {
        Some(key) => format!(
            "{}-{}-{}.bin",
            family,
            key.replace('/', PERSISTENCE.families.slash_replacement),
            bin
        ),
        None => format!("{}-{}.bin", family, bin),
    }
}
