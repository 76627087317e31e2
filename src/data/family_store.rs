use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use strum::IntoEnumIterator;

use crate::config::{CACHE_VERSION, DF, PERSISTENCE, family_cache_filename};
use crate::data::snapshot_file::{check_version, write_atomically};
use crate::domain::{BinLevel, ExchangeKey, Family};
use crate::models::{BinFamily, ChartData};
use crate::utils::{lock, now_timestamp_ms};

const ZOOM_BINS: [BinLevel; 3] = [BinLevel::Default, BinLevel::Hour, BinLevel::Day];

#[derive(Serialize)]
struct FamilyFileRef<'a, T> {
    version: &'a str,
    created_ms: i64,
    family: Family,
    bin: BinLevel,
    data: &'a T,
}

#[derive(Deserialize)]
struct FamilyFile<T> {
    #[allow(dead_code)]
    version: String,
    #[allow(dead_code)]
    created_ms: i64,
    family: Family,
    bin: BinLevel,
    data: T,
}

/// One versioned cache file per family, bin and (for keyed families) key.
/// Each family's files are read and written under that family's own lock.
pub struct FamilyStore {
    dir: PathBuf,
    locks: HashMap<Family, Mutex<()>>,
}

impl Default for FamilyStore {
    fn default() -> Self {
        Self::new(PERSISTENCE.families.directory)
    }
}

impl FamilyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Family::iter().map(|f| (f, Mutex::new(()))).collect(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, family: Family, bin: BinLevel, key: Option<&str>) -> PathBuf {
        self.dir.join(family_cache_filename(family, bin, key))
    }

    fn with_lock<R>(&self, family: Family, f: impl FnOnce() -> R) -> R {
        match self.locks.get(&family) {
            Some(mutex) => {
                let _held = lock(mutex);
                f()
            }
            None => f(),
        }
    }

    pub fn save<T: Serialize>(
        &self,
        family: Family,
        bin: BinLevel,
        key: Option<&str>,
        data: &T,
    ) -> Result<()> {
        let path = self.path(family, bin, key);
        let file = FamilyFileRef {
            version: CACHE_VERSION,
            created_ms: now_timestamp_ms(),
            family,
            bin,
            data,
        };
        let bytes = bincode::serialize(&file)
            .with_context(|| format!("Failed to serialize {}", path.display()))?;
        self.with_lock(family, || write_atomically(&path, &bytes))
    }

    /// `Ok(None)` when the file does not exist.
    pub fn load<T: DeserializeOwned>(
        &self,
        family: Family,
        bin: BinLevel,
        key: Option<&str>,
    ) -> Result<Option<T>> {
        let path = self.path(family, bin, key);
        let bytes = match self.with_lock(family, || fs::read(&path)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        check_version(&bytes, CACHE_VERSION)
            .with_context(|| format!("Rejected {}", path.display()))?;
        let file: FamilyFile<T> = bincode::deserialize(&bytes)
            .with_context(|| format!("Failed to deserialize {}", path.display()))?;
        if file.family != family || file.bin != bin {
            anyhow::bail!(
                "{} holds {}/{}, expected {}/{}",
                path.display(),
                file.family,
                file.bin,
                family,
                bin
            );
        }
        Ok(Some(file.data))
    }

    /// Exchange keys with a raw-bin file on disk.
    pub fn exchange_keys(&self) -> Result<Vec<ExchangeKey>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to list {}", self.dir.display()));
            }
        };
        let prefix = format!("{}-", Family::Exchange);
        let suffix = format!("-{}.bin", BinLevel::Default);

        let mut keys: Vec<ExchangeKey> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| {
                let key = name.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
                ExchangeKey::parse(&key.replace(PERSISTENCE.families.slash_replacement, "/"))
            })
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn save_zoomed<S: Serialize>(
        &self,
        family: Family,
        key: Option<&str>,
        sets: &BinFamily<S>,
    ) -> Result<usize> {
        for bin in ZOOM_BINS {
            self.save(family, bin, key, sets.get(bin))?;
        }
        Ok(ZOOM_BINS.len())
    }

    /// Write every set of `data`. Returns the number of files written.
    pub fn save_all(&self, data: &ChartData) -> Result<usize> {
        let mut written = 0;
        written += self.save_zoomed(Family::Mempool, None, &data.mempool)?;
        self.save(Family::Propagation, BinLevel::Default, None, &data.propagation)?;
        written += 1;
        written += self.save_zoomed(Family::Pow, None, &data.pow)?;
        written += self.save_zoomed(Family::Vsp, None, &data.vsp)?;
        for (key, sets) in &data.exchange {
            written += self.save_zoomed(Family::Exchange, Some(&key.to_string()), sets)?;
        }
        written += self.save_zoomed(Family::Snapshot, Some("nodes"), &data.nodes)?;
        written += self.save_zoomed(Family::Snapshot, Some("locations"), &data.locations)?;
        written += self.save_zoomed(Family::Snapshot, Some("versions"), &data.versions)?;
        self.save(Family::Blocks, BinLevel::Block, None, &data.blocks)?;
        self.save(Family::Blocks, BinLevel::Day, None, &data.days)?;
        self.save(Family::Blocks, BinLevel::Window, None, &data.windows)?;
        written += 3;

        if DF.log_persistence {
            log::info!("family cache: {} files written to {}", written, self.dir.display());
        }
        Ok(written)
    }

    /// Missing files leave their set empty; unreadable ones are logged and skipped.
    fn load_or_default<T: DeserializeOwned + Default>(
        &self,
        family: Family,
        bin: BinLevel,
        key: Option<&str>,
        loaded: &mut usize,
    ) -> T {
        match self.load(family, bin, key) {
            Ok(Some(data)) => {
                *loaded += 1;
                data
            }
            Ok(None) => T::default(),
            Err(e) => {
                log::warn!("family cache: {:#}", e);
                T::default()
            }
        }
    }

    fn load_zoomed<S: DeserializeOwned + Default>(
        &self,
        family: Family,
        key: Option<&str>,
        loaded: &mut usize,
    ) -> BinFamily<S> {
        BinFamily {
            raw: self.load_or_default(family, BinLevel::Default, key, loaded),
            hour: self.load_or_default(family, BinLevel::Hour, key, loaded),
            day: self.load_or_default(family, BinLevel::Day, key, loaded),
        }
    }

    /// Rebuild a full state from disk. Returns the state and the number of files read.
    pub fn load_all(&self) -> Result<(ChartData, usize)> {
        let mut loaded = 0;
        let mut data = ChartData {
            mempool: self.load_zoomed(Family::Mempool, None, &mut loaded),
            propagation: self.load_or_default(Family::Propagation, BinLevel::Default, None, &mut loaded),
            pow: self.load_zoomed(Family::Pow, None, &mut loaded),
            vsp: self.load_zoomed(Family::Vsp, None, &mut loaded),
            nodes: self.load_zoomed(Family::Snapshot, Some("nodes"), &mut loaded),
            locations: self.load_zoomed(Family::Snapshot, Some("locations"), &mut loaded),
            versions: self.load_zoomed(Family::Snapshot, Some("versions"), &mut loaded),
            blocks: self.load_or_default(Family::Blocks, BinLevel::Block, None, &mut loaded),
            days: self.load_or_default(Family::Blocks, BinLevel::Day, None, &mut loaded),
            windows: self.load_or_default(Family::Blocks, BinLevel::Window, None, &mut loaded),
            ..Default::default()
        };
        for key in self.exchange_keys()? {
            let sets = self.load_zoomed(Family::Exchange, Some(&key.to_string()), &mut loaded);
            data.exchange.insert(key, sets);
        }

        if DF.log_persistence {
            log::info!("family cache: {} files read from {}", loaded, self.dir.display());
        }
        Ok((data, loaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExchangeTick, PowRecord};
    use crate::models::PowSet;
    use tempfile::TempDir;

    #[test]
    fn test_save_all_then_load_all() {
        let dir = TempDir::new().unwrap();
        let store = FamilyStore::new(dir.path());

        let mut data = ChartData::default();
        data.pow.raw.append_records(&[PowRecord {
            time: 10,
            source: "pool".into(),
            hashrate: Some(5),
            workers: Some(2),
        }]);
        let key = ExchangeKey::new("binance", "DCR/BTC", 3600);
        data.append_exchange_ticks(&[ExchangeTick {
            key: key.clone(),
            time: 100,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
        }]);

        // 3 x (mempool, pow, vsp, one exchange key, three snapshot sets) + propagation + 3 chain
        assert_eq!(store.save_all(&data).unwrap(), 3 * 7 + 1 + 3);
        assert_eq!(store.exchange_keys().unwrap(), vec![key]);

        let (restored, loaded) = store.load_all().unwrap();
        assert_eq!(loaded, 25);
        assert_eq!(restored, data);
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = FamilyStore::new(dir.path());
        let set: Option<PowSet> = store.load(Family::Pow, BinLevel::Hour, None).unwrap();
        assert!(set.is_none());
        assert!(store.exchange_keys().unwrap().is_empty());
    }

    #[test]
    fn test_file_for_other_bin_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FamilyStore::new(dir.path());
        store
            .save(Family::Pow, BinLevel::Hour, None, &PowSet::default())
            .unwrap();
        fs::rename(
            store.path(Family::Pow, BinLevel::Hour, None),
            store.path(Family::Pow, BinLevel::Day, None),
        )
        .unwrap();
        let loaded: Result<Option<PowSet>> = store.load(Family::Pow, BinLevel::Day, None);
        assert!(loaded.is_err());
    }
}
