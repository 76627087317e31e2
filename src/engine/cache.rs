use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::DF;
use crate::domain::{AxisType, BinLevel, Family};
use crate::utils::{read_lock, write_lock};

/// Identity of one chart request. Sources are sorted so their order never splits entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub sources: Vec<String>,
    pub chart_id: String,
    pub bin: BinLevel,
    pub axis: AxisType,
}

impl CacheKey {
    pub fn new(chart_id: &str, bin: BinLevel, axis: AxisType, sources: &[String]) -> Self {
        let mut sorted = sources.to_vec();
        sorted.sort_unstable();
        Self {
            sources: sorted,
            chart_id: chart_id.to_string(),
            bin,
            axis,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachedChart {
    pub fingerprint: u64,
    pub payload: Arc<[u8]>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CachedChart>,
    /// Last time value per (family, bin), mirrored from the series data.
    fingerprints: HashMap<(Family, BinLevel), u64>,
}

/// Encoded chart payloads, in a lock domain separate from the series data.
#[derive(Default)]
pub struct ChartCache {
    state: RwLock<CacheState>,
}

impl ChartCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current fingerprint of a (family, bin) pair, 0 if never recorded.
    pub fn fingerprint(&self, family: Family, bin: BinLevel) -> u64 {
        read_lock(&self.state)
            .fingerprints
            .get(&(family, bin))
            .copied()
            .unwrap_or(0)
    }

    /// Payload for `key` if it was built at the family's current fingerprint.
    pub fn lookup(&self, key: &CacheKey, family: Family) -> Option<Arc<[u8]>> {
        let state = read_lock(&self.state);
        let current = state
            .fingerprints
            .get(&(family, key.bin))
            .copied()
            .unwrap_or(0);
        let hit = state
            .entries
            .get(key)
            .filter(|entry| entry.fingerprint == current)
            .map(|entry| entry.payload.clone());
        if DF.log_cache {
            log::debug!(
                "cache {}: {} {} {} [{}]",
                if hit.is_some() { "hit" } else { "miss" },
                key.chart_id,
                key.bin,
                key.axis,
                key.sources.join(",")
            );
        }
        hit
    }

    pub fn store(&self, key: CacheKey, fingerprint: u64, payload: Arc<[u8]>) {
        write_lock(&self.state).entries.insert(
            key,
            CachedChart {
                fingerprint,
                payload,
            },
        );
    }

    /// Replace every recorded fingerprint.
    pub fn set_fingerprints(&self, fingerprints: HashMap<(Family, BinLevel), u64>) {
        write_lock(&self.state).fingerprints = fingerprints;
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut state = write_lock(&self.state);
        if DF.log_cache {
            log::debug!("cache cleared ({} entries)", state.entries.len());
        }
        state.entries.clear();
    }

    pub fn len(&self) -> usize {
        read_lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
