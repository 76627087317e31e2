use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{AxisType, PowRecord};
use crate::engine::{Downsample, Ticks, reduce_keyed};
use crate::models::series_set::{pad_keyed, push_keyed, snip_keyed};
use crate::models::{ChartNullUints, ChartUints, Lengther, SeriesSet};

/// Mining pool hashrate and worker counts, keyed by pool.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PowSet {
    pub time: ChartUints,
    pub hashrate: BTreeMap<String, ChartNullUints>,
    pub workers: BTreeMap<String, ChartNullUints>,
    pub tip: u64,
}

impl PowSet {
    /// Append one point per distinct poll time newer than the current tail.
    /// Pools absent from a poll get a missing entry at that index.
    pub fn append_records(&mut self, records: &[PowRecord]) -> usize {
        let last = self.fingerprint();
        let fresh = records
            .iter()
            .filter(|r| self.time.is_empty() || r.time > last)
            .sorted_by_key(|r| r.time)
            .chunk_by(|r| r.time);

        let mut taken = 0;
        for (time, polls) in &fresh {
            let len = self.time.len();
            self.time.push(time);
            for rec in polls {
                push_keyed(&mut self.hashrate, &rec.source, len, rec.hashrate);
                push_keyed(&mut self.workers, &rec.source, len, rec.workers);
            }
            pad_keyed(&mut self.hashrate, len + 1);
            pad_keyed(&mut self.workers, len + 1);
            taken += 1;
        }
        taken
    }

    /// Per-pool series for the requested axis. Anything but workers selects hashrate.
    pub fn by_axis(&self, axis: AxisType) -> &BTreeMap<String, ChartNullUints> {
        match axis {
            AxisType::Workers => &self.workers,
            _ => &self.hashrate,
        }
    }
}

impl SeriesSet for PowSet {
    fn label(&self) -> &'static str {
        "pow"
    }

    fn time(&self) -> &ChartUints {
        &self.time
    }

    fn lengthers(&self) -> Vec<&dyn Lengther> {
        let mut lens: Vec<&dyn Lengther> = vec![&self.time];
        lens.extend(self.hashrate.values().map(|s| s as &dyn Lengther));
        lens.extend(self.workers.values().map(|s| s as &dyn Lengther));
        lens
    }

    fn snip(&mut self, len: usize) {
        self.time.snip(len);
        snip_keyed(&mut self.hashrate, len, ChartNullUints::snip);
        snip_keyed(&mut self.workers, len, ChartNullUints::snip);
    }
}

impl Downsample for PowSet {
    fn tip(&self) -> u64 {
        self.tip
    }

    fn set_tip(&mut self, tip: u64) {
        self.tip = tip;
    }

    fn append_bins(&mut self, raw: &Self, ticks: &Ticks) {
        let prev_len = self.time.len();
        reduce_keyed(&mut self.hashrate, &raw.hashrate, ticks, prev_len, |s, a, b| s.avg(a, b));
        reduce_keyed(&mut self.workers, &raw.workers, ticks, prev_len, |s, a, b| s.avg(a, b));
        self.time.extend(ticks.boundaries.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constants::AN_HOUR;
    use crate::engine::lengthen_set;

    fn poll(time: u64, source: &str, hashrate: Option<u64>) -> PowRecord {
        PowRecord {
            time,
            source: source.to_string(),
            hashrate,
            workers: hashrate.map(|h| h / 10),
        }
    }

    #[test]
    fn test_polls_group_by_time_and_pad_missing_pools() {
        let mut set = PowSet::default();
        let taken = set.append_records(&[
            poll(100, "alpha", Some(50)),
            poll(100, "beta", Some(70)),
            poll(200, "alpha", Some(60)),
        ]);
        assert_eq!(taken, 2);
        assert_eq!(set.time.0, vec![100, 200]);
        assert_eq!(set.hashrate["beta"].0, vec![Some(70), None]);
        assert_eq!(set.normalize(), 2);
    }

    #[test]
    fn test_new_pool_is_back_padded() {
        let mut set = PowSet::default();
        set.append_records(&[poll(100, "alpha", Some(1))]);
        set.append_records(&[poll(200, "gamma", Some(2)), poll(50, "alpha", Some(9))]);
        assert_eq!(set.hashrate["gamma"].0, vec![None, Some(2)]);
        assert_eq!(set.hashrate["alpha"].0, vec![Some(1), None]);
    }

    #[test]
    fn test_hour_bins_reduce_every_pool() {
        let mut raw = PowSet::default();
        raw.append_records(&[
            poll(0, "alpha", Some(10)),
            poll(1800, "alpha", Some(30)),
            poll(1800, "beta", Some(8)),
            poll(3600, "alpha", Some(5)),
        ]);
        let mut hour = PowSet::default();
        assert_eq!(lengthen_set(&raw, &mut hour, AN_HOUR), 1);
        assert_eq!(hour.hashrate["alpha"].0, vec![Some(20)]);
        assert_eq!(hour.hashrate["beta"].0, vec![Some(4)]);
        assert_eq!(hour.normalize(), 1);
    }
}
