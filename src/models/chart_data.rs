use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{BinLevel, ExchangeKey, ExchangeTick, Family, NetworkSnapshotRecord};
use crate::error::ChartError;
use crate::models::{
    BinFamily, BlockSet, ExchangeTickSet, KeyedCountSet, MempoolSet, NodeCountSet, PowSet,
    PropagationSet, SeriesSet, VspSet, WindowSet,
};

/// Every series set the engine serves charts from. Guarded as a whole by the engine's
/// data lock.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChartData {
    pub mempool: BinFamily<MempoolSet>,
    pub propagation: PropagationSet,
    pub pow: BinFamily<PowSet>,
    pub vsp: BinFamily<VspSet>,
    pub exchange: BTreeMap<ExchangeKey, BinFamily<ExchangeTickSet>>,
    pub nodes: BinFamily<NodeCountSet>,
    pub locations: BinFamily<KeyedCountSet>,
    pub versions: BinFamily<KeyedCountSet>,
    pub blocks: BlockSet,
    pub days: BlockSet,
    pub windows: WindowSet,
}

/// One row of [`ChartData::summary`].
#[derive(Debug, Clone, PartialEq)]
pub struct SetSummary {
    pub family: Family,
    pub bin: BinLevel,
    pub label: &'static str,
    pub len: usize,
    pub fingerprint: u64,
}

impl ChartData {
    /// Fingerprint of the primary family: the newest block timestamp.
    pub fn state_id(&self) -> u64 {
        self.blocks.fingerprint()
    }

    /// Newest raw point of a family, used by collectors to fetch only what is new.
    /// Blocks and propagation report heights; everything else reports timestamps.
    pub fn tip(&self, family: Family) -> u64 {
        match family {
            Family::Blocks => self.blocks.tip_height(),
            Family::Exchange => self.exchange_fingerprint(BinLevel::Default),
            _ => self.fingerprint(family, BinLevel::Default),
        }
    }

    /// Last time value of the set materialised for `bin` (resolved per family), 0 if empty.
    pub fn fingerprint(&self, family: Family, bin: BinLevel) -> u64 {
        let bin = family.resolve_bin(bin);
        match family {
            Family::Exchange => self.exchange_fingerprint(bin),
            _ => self
                .sets(family, bin)
                .first()
                .map(|set| set.fingerprint())
                .unwrap_or(0),
        }
    }

    fn exchange_fingerprint(&self, bin: BinLevel) -> u64 {
        self.exchange
            .values()
            .map(|sets| sets.get(bin).fingerprint())
            .max()
            .unwrap_or(0)
    }

    /// Sets stored for `family` at `bin`. The first entry defines the fingerprint.
    fn sets(&self, family: Family, bin: BinLevel) -> Vec<&dyn SeriesSet> {
        match family {
            Family::Mempool => vec![self.mempool.get(bin) as &dyn SeriesSet],
            Family::Propagation => vec![&self.propagation as &dyn SeriesSet],
            Family::Pow => vec![self.pow.get(bin) as &dyn SeriesSet],
            Family::Vsp => vec![self.vsp.get(bin) as &dyn SeriesSet],
            Family::Exchange => self
                .exchange
                .values()
                .map(|sets| sets.get(bin) as &dyn SeriesSet)
                .collect(),
            Family::Snapshot => vec![
                self.nodes.get(bin) as &dyn SeriesSet,
                self.locations.get(bin),
                self.versions.get(bin),
            ],
            Family::Blocks => match bin {
                BinLevel::Day => vec![&self.days as &dyn SeriesSet],
                BinLevel::Window => vec![&self.windows as &dyn SeriesSet],
                _ => vec![&self.blocks as &dyn SeriesSet],
            },
        }
    }

    fn sets_mut(&mut self, family: Family) -> Vec<&mut dyn SeriesSet> {
        fn zoomed<'a, S: SeriesSet + 'a>(f: &'a mut BinFamily<S>) -> [&'a mut dyn SeriesSet; 3] {
            [&mut f.raw, &mut f.hour, &mut f.day]
        }
        match family {
            Family::Mempool => zoomed(&mut self.mempool).into(),
            Family::Propagation => vec![&mut self.propagation as &mut dyn SeriesSet],
            Family::Pow => zoomed(&mut self.pow).into(),
            Family::Vsp => zoomed(&mut self.vsp).into(),
            Family::Exchange => self
                .exchange
                .values_mut()
                .flat_map(|sets| zoomed(sets))
                .collect(),
            Family::Snapshot => {
                let mut sets: Vec<&mut dyn SeriesSet> = Vec::with_capacity(9);
                sets.extend(zoomed(&mut self.nodes));
                sets.extend(zoomed(&mut self.locations));
                sets.extend(zoomed(&mut self.versions));
                sets
            }
            Family::Blocks => vec![
                &mut self.blocks as &mut dyn SeriesSet,
                &mut self.days,
                &mut self.windows,
            ],
        }
    }

    /// Validate every set of a family, snipping mismatched ones to their shortest member.
    pub fn normalize_family(&mut self, family: Family) {
        for set in self.sets_mut(family) {
            set.normalize();
        }
    }

    /// Check that no derived set runs ahead of the raw data it was built from.
    pub fn check_family(&self, family: Family) -> Result<(), ChartError> {
        let behind = |derived: u64, raw: u64| derived == 0 || derived <= raw;
        let ok = match family {
            Family::Mempool => zoom_consistent(&self.mempool, behind),
            Family::Pow => zoom_consistent(&self.pow, behind),
            Family::Vsp => zoom_consistent(&self.vsp, behind),
            Family::Exchange => self.exchange.values().all(|f| zoom_consistent(f, behind)),
            Family::Snapshot => {
                zoom_consistent(&self.nodes, behind)
                    && zoom_consistent(&self.locations, behind)
                    && zoom_consistent(&self.versions, behind)
            }
            Family::Blocks => behind(self.days.fingerprint(), self.blocks.fingerprint()),
            Family::Propagation => true,
        };
        if ok {
            Ok(())
        } else {
            Err(ChartError::DerivedAhead(family.to_string()))
        }
    }

    /// Drop everything a family holds, derived sets and tips included.
    pub fn clear_family(&mut self, family: Family) {
        match family {
            Family::Mempool => self.mempool = BinFamily::default(),
            Family::Propagation => self.propagation = PropagationSet::default(),
            Family::Pow => self.pow = BinFamily::default(),
            Family::Vsp => self.vsp = BinFamily::default(),
            Family::Exchange => self.exchange.clear(),
            Family::Snapshot => {
                self.nodes = BinFamily::default();
                self.locations = BinFamily::default();
                self.versions = BinFamily::default();
            }
            Family::Blocks => {
                self.blocks = BlockSet::default();
                self.days = BlockSet::default();
                self.windows = WindowSet::default();
            }
        }
    }

    /// Route candles to their key's raw set.
    pub fn append_exchange_ticks(&mut self, ticks: &[ExchangeTick]) -> usize {
        let mut by_key: BTreeMap<&ExchangeKey, Vec<&ExchangeTick>> = BTreeMap::new();
        for tick in ticks {
            by_key.entry(&tick.key).or_default().push(tick);
        }
        by_key
            .into_iter()
            .map(|(key, ticks)| {
                self.exchange
                    .entry(key.clone())
                    .or_default()
                    .raw
                    .append_ticks(ticks)
            })
            .sum()
    }

    /// Split crawler snapshots into node counts and the two breakdowns.
    pub fn append_snapshots(&mut self, records: &[NetworkSnapshotRecord]) -> usize {
        for rec in records {
            self.locations.raw.append_breakdown(rec.time, &rec.locations);
            self.versions.raw.append_breakdown(rec.time, &rec.versions);
        }
        self.nodes.raw.append_records(records)
    }

    /// Length and fingerprint of every stored set.
    pub fn summary(&self) -> Vec<SetSummary> {
        use strum::IntoEnumIterator;

        let mut rows = Vec::new();
        for family in Family::iter() {
            for &bin in family.bins() {
                for set in self.sets(family, bin) {
                    rows.push(SetSummary {
                        family,
                        bin,
                        label: set.label(),
                        len: set.length(),
                        fingerprint: set.fingerprint(),
                    });
                }
            }
        }
        rows
    }
}

fn zoom_consistent<S: SeriesSet>(f: &BinFamily<S>, behind: impl Fn(u64, u64) -> bool) -> bool {
    let raw = f.raw.fingerprint();
    behind(f.hour.fingerprint(), raw) && behind(f.day.fingerprint(), raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlockRecord;

    #[test]
    fn test_fingerprint_follows_bin() {
        let mut data = ChartData::default();
        data.mempool.raw.time.push(500);
        data.mempool.hour.time.push(0);
        assert_eq!(data.fingerprint(Family::Mempool, BinLevel::Default), 500);
        assert_eq!(data.fingerprint(Family::Mempool, BinLevel::Hour), 0);
        assert_eq!(data.fingerprint(Family::Mempool, BinLevel::Block), 500);
    }

    #[test]
    fn test_state_id_tracks_blocks() {
        let mut data = ChartData::default();
        assert_eq!(data.state_id(), 0);
        data.blocks.append_records(&[BlockRecord {
            height: 7,
            time: 1234,
            ..Default::default()
        }]);
        assert_eq!(data.state_id(), 1234);
        assert_eq!(data.tip(Family::Blocks), 7);
    }

    #[test]
    fn test_exchange_ticks_route_by_key() {
        let mut data = ChartData::default();
        let key = ExchangeKey::new("binance", "DCR/BTC", 3600);
        let tick = |time| ExchangeTick {
            key: key.clone(),
            time,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
        };
        assert_eq!(data.append_exchange_ticks(&[tick(10), tick(20)]), 2);
        assert_eq!(data.tip(Family::Exchange), 20);
        assert_eq!(data.exchange[&key].raw.time.0, vec![10, 20]);
    }

    #[test]
    fn test_derived_ahead_of_raw_fails_check() {
        let mut data = ChartData::default();
        data.pow.raw.time.push(100);
        data.pow.hour.time.push(3600);
        assert!(data.check_family(Family::Pow).is_err());
        data.clear_family(Family::Pow);
        assert!(data.check_family(Family::Pow).is_ok());
        assert_eq!(data.pow, BinFamily::default());
    }
}
