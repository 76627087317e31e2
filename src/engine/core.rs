use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;

use crate::config::{CACHE_VERSION, DF};
use crate::data::{FamilyStore, encode_snapshot, read_snapshot, write_atomically};
use crate::domain::{BinLevel, Family, parse_axis, parse_request_bin};
use crate::error::ChartError;
use crate::models::{ChartData, SetSummary};
use crate::utils::{format_duration, now_timestamp_ms, read_lock, write_lock};

use super::cache::{CacheKey, ChartCache};
use super::charts::{ChartMaker, ChartRegistry, ChartRequest};
use super::updater::{ChartUpdater, UpdateStep};

/// Series data, chart cache and update steps for one running instance.
///
/// Two lock domains: `data` is held shared while charts are built and exclusively while
/// steps append; the cache has its own lock so lookups never wait on a slow build.
pub struct ChartEngine {
    data: RwLock<ChartData>,
    cache: ChartCache,
    registry: RwLock<ChartRegistry>,
    updaters: RwLock<Vec<Arc<dyn UpdateStep>>>,
}

impl Default for ChartEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartEngine {
    /// Empty engine with every built-in chart registered.
    pub fn new() -> Self {
        Self::with_data(ChartData::default())
    }

    pub fn with_data(data: ChartData) -> Self {
        let engine = Self {
            data: RwLock::new(ChartData::default()),
            cache: ChartCache::new(),
            registry: RwLock::new(ChartRegistry::default()),
            updaters: RwLock::new(Vec::new()),
        };
        engine.install(data);
        engine
    }

    /// Add or replace a chart builder on this instance only.
    pub fn register_chart(
        &self,
        id: &str,
        family: Family,
        fixed_bin: Option<BinLevel>,
        maker: ChartMaker,
    ) {
        write_lock(&self.registry).register(id, family, fixed_bin, maker);
        self.cache.clear();
    }

    /// Append a step to the update cycle. Steps run in registration order.
    pub fn add_updater<U: ChartUpdater + 'static>(&self, updater: U) {
        write_lock(&self.updaters).push(Arc::new(updater));
    }

    /// Encoded JSON for one chart.
    ///
    /// A cached payload is returned as is while its family's fingerprint is unchanged.
    /// Otherwise the builder runs under the shared data lock and the result is cached.
    pub fn chart(
        &self,
        chart_id: &str,
        bin: &str,
        axis: &str,
        sources: &[String],
    ) -> Result<Arc<[u8]>, ChartError> {
        let registered = read_lock(&self.registry)
            .get(chart_id)
            .cloned()
            .ok_or_else(|| ChartError::UnknownChart(chart_id.to_string()))?;
        let bin = registered.resolve_bin(parse_request_bin(bin));
        let axis = parse_axis(axis);

        // Builders see the same sorted sources the cache key is made of.
        let key = CacheKey::new(chart_id, bin, axis, sources);
        if let Some(payload) = self.cache.lookup(&key, registered.family) {
            return Ok(payload);
        }

        let request = ChartRequest {
            chart_id: chart_id.to_string(),
            bin,
            axis,
            sources: key.sources.clone(),
        };
        let (value, fingerprint) = {
            let data = read_lock(&self.data);
            let fingerprint = data.fingerprint(registered.family, bin);
            ((registered.maker)(&data, &request)?, fingerprint)
        };

        let payload: Arc<[u8]> = serde_json::to_vec(&value)?.into();
        self.cache.store(key, fingerprint, payload.clone());
        Ok(payload)
    }

    /// Run `f` under the shared data lock.
    pub fn read<R>(&self, f: impl FnOnce(&ChartData) -> R) -> R {
        f(&read_lock(&self.data))
    }

    /// Run `f` under the exclusive data lock, then refresh fingerprints and drop every
    /// cached chart.
    pub fn update_data<R>(&self, f: impl FnOnce(&mut ChartData) -> R) -> R {
        let mut data = write_lock(&self.data);
        let out = f(&mut data);
        self.cache.set_fingerprints(fingerprints(&data));
        self.cache.clear();
        out
    }

    /// Global fingerprint captured by update steps before fetching.
    pub fn state_id(&self) -> u64 {
        self.read(ChartData::state_id)
    }

    pub fn tip(&self, family: Family) -> u64 {
        self.read(|data| data.tip(family))
    }

    /// Extend every derived set. Returns the number of points added.
    pub fn lengthen(&self) -> usize {
        self.update_data(ChartData::lengthen)
    }

    pub fn summary(&self) -> Vec<SetSummary> {
        self.read(ChartData::summary)
    }

    pub fn cached_charts(&self) -> usize {
        self.cache.len()
    }

    /// Run one update cycle: every step in order, then the lengthen pass.
    /// The first failing step aborts the cycle; steps already applied stay applied.
    pub async fn update(&self, cancel: &CancellationToken) -> Result<usize, ChartError> {
        let steps: Vec<Arc<dyn UpdateStep>> = read_lock(&self.updaters).clone();
        for step in steps {
            if DF.log_updates {
                log::debug!("update: running {}", step.tag());
            }
            step.run(self, cancel).await?;
        }
        let added = self.lengthen();
        if DF.log_updates {
            log::info!("update: cycle complete, {} derived points added", added);
        }
        Ok(added)
    }

    /// Replace the live data, normalise it and clear any family that fails the
    /// consistency check. Returns the number of families cleared.
    fn install(&self, data: ChartData) -> usize {
        self.update_data(|current| {
            *current = data;
            let mut cleared = 0;
            for family in Family::iter() {
                current.normalize_family(family);
                if let Err(e) = current.check_family(family) {
                    log::warn!("{}: clearing family after load", e);
                    current.clear_family(family);
                    cleared += 1;
                }
            }
            cleared
        })
    }

    /// Write the whole state as a versioned snapshot. Returns the bytes written.
    pub fn dump(&self, path: &Path) -> Result<usize> {
        let bytes = self.read(|data| encode_snapshot(data, CACHE_VERSION))?;
        write_atomically(path, &bytes)?;
        if DF.log_persistence {
            log::info!("snapshot written: {} ({} bytes)", path.display(), bytes.len());
        }
        Ok(bytes.len())
    }

    /// Replace the live state with a snapshot. On any failure, version mismatch
    /// included, the live state is left untouched.
    pub fn load(&self, path: &Path) -> Result<()> {
        let snapshot = read_snapshot(path, CACHE_VERSION)?;
        let cleared = self.install(snapshot.data);
        if DF.log_persistence {
            log::info!(
                "snapshot loaded: {} ({} old, {} families cleared)",
                path.display(),
                format_duration(now_timestamp_ms() - snapshot.created_ms),
                cleared
            );
        }
        Ok(())
    }

    /// Load the snapshot if possible, then run one update cycle either way.
    pub async fn load_and_update(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<usize, ChartError> {
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || read_snapshot(&owned, CACHE_VERSION)).await {
            Ok(Ok(snapshot)) => {
                self.install(snapshot.data);
            }
            Ok(Err(e)) => log::warn!("starting cold, snapshot not loaded: {:#}", e),
            Err(e) => log::error!("snapshot load task failed: {}", e),
        }
        self.update(cancel).await
    }

    /// Write one cache file per family and bin. Returns the number of files written.
    pub fn save_families(&self, store: &FamilyStore) -> Result<usize> {
        let data = self.read(ChartData::clone);
        store.save_all(&data)
    }

    /// Rebuild the state from per-family cache files; missing or unreadable files
    /// leave their family empty. Returns the number of files read.
    pub fn load_families(&self, store: &FamilyStore) -> Result<usize> {
        let (data, loaded) = store.load_all()?;
        self.install(data);
        Ok(loaded)
    }
}

fn fingerprints(data: &ChartData) -> HashMap<(Family, BinLevel), u64> {
    Family::iter()
        .flat_map(|family| {
            family
                .bins()
                .iter()
                .map(move |&bin| ((family, bin), data.fingerprint(family, bin)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlockRecord, MempoolRecord, PropagationRecord, chart_id};
    use serde_json::{Value, json};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn mempool(time: u64, size: u64) -> MempoolRecord {
        MempoolRecord {
            time,
            size,
            tx_count: 0,
            total_fee: 0.0,
        }
    }

    fn decode(payload: &[u8]) -> Value {
        serde_json::from_slice(payload).unwrap()
    }

    #[test]
    fn test_repeated_request_skips_builder() {
        let engine = ChartEngine::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        engine.register_chart(
            "counted",
            Family::Mempool,
            None,
            Arc::new(move |data: &ChartData, _: &ChartRequest| -> Result<Value, ChartError> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!(data.mempool.raw.time.len()))
            }),
        );

        let first = engine.chart("counted", "", "", &[]).unwrap();
        let second = engine.chart("counted", "", "", &[]).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Different source order, same entry.
        let a = vec!["x".to_string(), "y".to_string()];
        let b = vec!["y".to_string(), "x".to_string()];
        engine.chart("counted", "", "", &a).unwrap();
        engine.chart("counted", "", "", &b).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_source_order_does_not_change_payload() {
        let propagated = |engine: &ChartEngine| {
            engine.update_data(|data| {
                data.propagation.append_records(&[PropagationRecord {
                    height: 1,
                    time: 60,
                    source_deviations: BTreeMap::from([("a".to_string(), 1.0), ("b".to_string(), 2.0)]),
                    ..Default::default()
                }])
            });
        };
        let ab = vec!["a".to_string(), "b".to_string()];
        let ba = vec!["b".to_string(), "a".to_string()];
        let expected = json!({"x": [1], "y": [1.0], "z": [2.0]});

        let engine = ChartEngine::new();
        propagated(&engine);
        let first = decode(&engine.chart(chart_id::BLOCK_PROPAGATION, "", "", &ab).unwrap());
        let cached = decode(&engine.chart(chart_id::BLOCK_PROPAGATION, "", "", &ba).unwrap());
        assert_eq!(first, expected);
        assert_eq!(cached, expected);

        let fresh = ChartEngine::new();
        propagated(&fresh);
        let built = decode(&fresh.chart(chart_id::BLOCK_PROPAGATION, "", "", &ba).unwrap());
        assert_eq!(built, expected);
    }

    #[test]
    fn test_new_point_invalidates_chart() {
        let engine = ChartEngine::new();
        engine.update_data(|data| data.mempool.raw.append_records(&[mempool(10, 1)]));
        let before = decode(&engine.chart(chart_id::MEMPOOL_SIZE, "", "time", &[]).unwrap());
        assert_eq!(before, json!({"x": [10], "y": [1]}));

        engine.update_data(|data| data.mempool.raw.append_records(&[mempool(20, 2)]));
        let after = decode(&engine.chart(chart_id::MEMPOOL_SIZE, "", "time", &[]).unwrap());
        assert_eq!(after, json!({"x": [10, 20], "y": [1, 2]}));
    }

    #[test]
    fn test_unknown_chart() {
        let engine = ChartEngine::new();
        let err = engine.chart("no-such-chart", "", "", &[]).unwrap_err();
        assert!(matches!(err, ChartError::UnknownChart(id) if id == "no-such-chart"));
    }

    #[test]
    fn test_block_charts_resolve_bins() {
        let engine = ChartEngine::new();
        engine.update_data(|data| {
            data.blocks.append_records(&[
                BlockRecord { height: 1, time: 0, block_size: 5, ..Default::default() },
                BlockRecord { height: 2, time: 86_400, block_size: 7, ..Default::default() },
            ]);
            data.lengthen()
        });
        let day = decode(&engine.chart(chart_id::BLOCK_SIZE, "day", "height", &[]).unwrap());
        assert_eq!(day, json!({"x": [1], "y": [5]}));
        // Unrecognised bins fall back to per-block data.
        let block = decode(&engine.chart(chart_id::BLOCK_SIZE, "bogus", "time", &[]).unwrap());
        assert_eq!(block, json!({"x": [0, 86400], "y": [5, 7]}));
    }

    #[test]
    fn test_concurrent_chart_requests_agree() {
        let engine = ChartEngine::new();
        engine.update_data(|data| {
            let records: Vec<_> = (0..100).map(|i| mempool(i * 60, i)).collect();
            data.mempool.raw.append_records(&records)
        });

        let payloads: Vec<Arc<[u8]>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| engine.chart(chart_id::MEMPOOL_SIZE, "", "", &[]).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(payloads.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(engine.cached_charts(), 1);
    }
}
