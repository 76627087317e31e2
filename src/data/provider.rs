use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::DF;
use crate::domain::{
    BlockRecord, ExchangeTick, Family, MempoolRecord, NetworkSnapshotRecord, PowRecord,
    PropagationRecord, VspRecord, WindowRecord,
};
use crate::engine::{ChartEngine, ChartUpdater};
use crate::models::{ChartData, SeriesSet};
use crate::utils::lock;

/// A record type the engine knows how to route into its series sets.
pub trait FamilyRecord: Clone + Send + Sync + 'static {
    const FAMILY: Family;

    /// Time or height this record sits at, comparable with [`FamilyRecord::tip`].
    fn position(&self) -> u64;

    /// Newest position already stored for this record type.
    fn tip(data: &ChartData) -> u64 {
        data.tip(Self::FAMILY)
    }

    /// Append records, skipping stale ones. Returns how many were taken.
    fn append_all(data: &mut ChartData, records: &[Self]) -> usize;
}

impl FamilyRecord for MempoolRecord {
    const FAMILY: Family = Family::Mempool;

    fn position(&self) -> u64 {
        self.time
    }

    fn append_all(data: &mut ChartData, records: &[Self]) -> usize {
        data.mempool.raw.append_records(records)
    }
}

impl FamilyRecord for PropagationRecord {
    const FAMILY: Family = Family::Propagation;

    fn position(&self) -> u64 {
        self.height
    }

    fn append_all(data: &mut ChartData, records: &[Self]) -> usize {
        data.propagation.append_records(records)
    }
}

impl FamilyRecord for PowRecord {
    const FAMILY: Family = Family::Pow;

    fn position(&self) -> u64 {
        self.time
    }

    fn append_all(data: &mut ChartData, records: &[Self]) -> usize {
        data.pow.raw.append_records(records)
    }
}

impl FamilyRecord for VspRecord {
    const FAMILY: Family = Family::Vsp;

    fn position(&self) -> u64 {
        self.time
    }

    fn append_all(data: &mut ChartData, records: &[Self]) -> usize {
        data.vsp.raw.append_records(records)
    }
}

impl FamilyRecord for ExchangeTick {
    const FAMILY: Family = Family::Exchange;

    fn position(&self) -> u64 {
        self.time
    }

    // Keys are dated independently, so the source hands over everything and each
    // key's set drops its own stale candles.
    fn tip(_: &ChartData) -> u64 {
        0
    }

    fn append_all(data: &mut ChartData, records: &[Self]) -> usize {
        data.append_exchange_ticks(records)
    }
}

impl FamilyRecord for NetworkSnapshotRecord {
    const FAMILY: Family = Family::Snapshot;

    fn position(&self) -> u64 {
        self.time
    }

    fn append_all(data: &mut ChartData, records: &[Self]) -> usize {
        data.append_snapshots(records)
    }
}

impl FamilyRecord for BlockRecord {
    const FAMILY: Family = Family::Blocks;

    fn position(&self) -> u64 {
        self.height
    }

    fn append_all(data: &mut ChartData, records: &[Self]) -> usize {
        data.blocks.append_records(records)
    }
}

impl FamilyRecord for WindowRecord {
    const FAMILY: Family = Family::Blocks;

    fn position(&self) -> u64 {
        self.time
    }

    // Windows share the chain family but are dated independently of blocks.
    fn tip(data: &ChartData) -> u64 {
        data.windows.fingerprint()
    }

    fn append_all(data: &mut ChartData, records: &[Self]) -> usize {
        data.windows.append_records(records)
    }
}

/// Abstract interface for a collector.
#[async_trait]
pub trait RecordSource<R>: Send + Sync {
    /// Records newer than `tip` (everything when `tip` is 0).
    async fn records_since(&self, tip: u64, cancel: CancellationToken) -> Result<Vec<R>>;
}

fn newer_than<R: FamilyRecord>(records: impl IntoIterator<Item = R>, tip: u64) -> Vec<R> {
    records
        .into_iter()
        .filter(|r| tip == 0 || r.position() > tip)
        .collect()
}

/// Adapts a [`RecordSource`] into an update step for its record's family.
pub struct SourceUpdater<R, S> {
    tag: String,
    source: S,
    _records: PhantomData<fn() -> R>,
}

impl<R, S> SourceUpdater<R, S> {
    pub fn new(tag: impl Into<String>, source: S) -> Self {
        Self {
            tag: tag.into(),
            source,
            _records: PhantomData,
        }
    }
}

#[async_trait]
impl<R, S> ChartUpdater for SourceUpdater<R, S>
where
    R: FamilyRecord,
    S: RecordSource<R>,
{
    type Records = Vec<R>;

    fn tag(&self) -> &str {
        &self.tag
    }

    async fn fetch(&self, engine: &ChartEngine, cancel: CancellationToken) -> Result<Vec<R>> {
        let tip = engine.read(R::tip);
        self.source.records_since(tip, cancel).await
    }

    fn append(&self, data: &mut ChartData, records: Vec<R>) -> Result<()> {
        let taken = R::append_all(data, &records);
        if DF.log_updates {
            log::debug!("{}: {} of {} records appended", self.tag, taken, records.len());
        }
        Ok(())
    }
}

/// Records pushed in-process, handed out by position.
pub struct MemorySource<R> {
    records: Mutex<Vec<R>>,
}

impl<R> Default for MemorySource<R> {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
}

impl<R> MemorySource<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn push(&self, records: impl IntoIterator<Item = R>) {
        lock(&self.records).extend(records);
    }
}

#[async_trait]
impl<R: FamilyRecord> RecordSource<R> for MemorySource<R> {
    async fn records_since(&self, tip: u64, _cancel: CancellationToken) -> Result<Vec<R>> {
        let records = lock(&self.records).clone();
        Ok(newer_than(records, tip))
    }
}

/// Reads a JSON array of records from a file on every fetch. A missing file yields
/// no records.
pub struct JsonFileSource<R> {
    path: PathBuf,
    _records: PhantomData<fn() -> R>,
}

impl<R> JsonFileSource<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _records: PhantomData,
        }
    }
}

#[async_trait]
impl<R: FamilyRecord + DeserializeOwned> RecordSource<R> for JsonFileSource<R> {
    async fn records_since(&self, tip: u64, cancel: CancellationToken) -> Result<Vec<R>> {
        let read = tokio::select! {
            _ = cancel.cancelled() => anyhow::bail!("cancelled reading {}", self.path.display()),
            read = tokio::fs::read(&self.path) => read,
        };
        let bytes = match read {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };
        let records: Vec<R> = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(newer_than(records, tip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExchangeKey;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn block(height: u64, time: u64) -> BlockRecord {
        BlockRecord {
            height,
            time,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_source_updater_fetches_past_tip() {
        let engine = ChartEngine::new();
        let source = std::sync::Arc::new(MemorySource::new(vec![block(1, 100), block(2, 200)]));
        engine.add_updater(SourceUpdater::<BlockRecord, _>::new("blocks", SharedSource(source.clone())));

        engine.update(&CancellationToken::new()).await.unwrap();
        assert_eq!(engine.tip(Family::Blocks), 2);

        source.push([block(3, 300)]);
        let fresh = source
            .records_since(engine.tip(Family::Blocks), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(fresh, vec![block(3, 300)]);

        engine.update(&CancellationToken::new()).await.unwrap();
        engine.read(|data| assert_eq!(data.blocks.heights.0, vec![1, 2, 3]));
    }

    /// Lets a test keep a handle on a source the engine owns.
    struct SharedSource<R>(std::sync::Arc<MemorySource<R>>);

    #[async_trait]
    impl<R: FamilyRecord> RecordSource<R> for SharedSource<R> {
        async fn records_since(&self, tip: u64, cancel: CancellationToken) -> Result<Vec<R>> {
            self.0.records_since(tip, cancel).await
        }
    }

    #[tokio::test]
    async fn test_lagging_exchange_key_keeps_new_candles() {
        let ahead = ExchangeKey::new("binance", "DCR/BTC", 3600);
        let behind = ExchangeKey::new("bittrex", "DCR/BTC", 3600);
        let tick = |key: &ExchangeKey, time| ExchangeTick {
            key: key.clone(),
            time,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
        };

        let engine = ChartEngine::new();
        let source = std::sync::Arc::new(MemorySource::new(vec![
            tick(&ahead, 3600),
            tick(&ahead, 7200),
            tick(&behind, 3600),
        ]));
        engine.add_updater(SourceUpdater::<ExchangeTick, _>::new("exchange", SharedSource(source.clone())));
        engine.update(&CancellationToken::new()).await.unwrap();

        source.push([tick(&behind, 5400)]);
        engine.update(&CancellationToken::new()).await.unwrap();
        engine.read(|data| {
            assert_eq!(data.exchange[&ahead].raw.time.0, vec![3600, 7200]);
            assert_eq!(data.exchange[&behind].raw.time.0, vec![3600, 5400]);
        });
    }

    #[tokio::test]
    async fn test_json_file_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshots.json");
        let source: JsonFileSource<NetworkSnapshotRecord> = JsonFileSource::new(&path);
        assert!(source.records_since(0, CancellationToken::new()).await.unwrap().is_empty());

        let records = vec![NetworkSnapshotRecord {
            time: 60,
            nodes: 10,
            reachable_nodes: 8,
            locations: BTreeMap::from([("DE".to_string(), 4)]),
            versions: BTreeMap::new(),
        }];
        std::fs::write(&path, serde_json::to_vec(&records).unwrap()).unwrap();
        assert_eq!(source.records_since(0, CancellationToken::new()).await.unwrap(), records);
        assert!(source.records_since(60, CancellationToken::new()).await.unwrap().is_empty());
    }
}
