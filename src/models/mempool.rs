use serde::{Deserialize, Serialize};

use crate::domain::MempoolRecord;
use crate::engine::{Downsample, Ticks};
use crate::models::{ChartFloats, ChartUints, Lengther, SeriesSet};

/// Mempool size, transaction count and total fees over time.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MempoolSet {
    pub time: ChartUints,
    /// Best block height at each timestamp. Back-filled from propagation data, so the
    /// raw set may briefly hold fewer heights than timestamps.
    pub heights: ChartUints,
    pub size: ChartUints,
    pub tx_count: ChartUints,
    pub fees: ChartFloats,
    pub tip: u64,
}

impl MempoolSet {
    /// Append records newer than the current tail. Returns how many were taken.
    pub fn append_records(&mut self, records: &[MempoolRecord]) -> usize {
        let mut last = self.fingerprint();
        let mut taken = 0;
        for rec in records {
            if rec.time <= last && !self.time.is_empty() {
                log::debug!("mempool: skipping stale record at {}", rec.time);
                continue;
            }
            self.time.push(rec.time);
            self.size.push(rec.size);
            self.tx_count.push(rec.tx_count);
            self.fees.push(rec.total_fee);
            last = rec.time;
            taken += 1;
        }
        taken
    }

    /// Assign a height to every timestamp that lacks one, using block arrival times.
    ///
    /// A timestamp takes the height of the latest block seen at or before it. Filling
    /// stops at the first timestamp not yet followed by a known block, since a later
    /// block could still arrive for it.
    pub fn backfill_heights(&mut self, block_times: &[u64], block_heights: &[u64]) -> usize {
        let known = block_times.len().min(block_heights.len());
        let (block_times, block_heights) = (&block_times[..known], &block_heights[..known]);
        let mut filled = 0;

        while self.heights.len() < self.time.len() {
            let t = self.time[self.heights.len()];
            let idx = block_times.partition_point(|&bt| bt <= t);
            if idx >= block_times.len() {
                break;
            }
            let height = match idx {
                0 => 0,
                i => block_heights[i - 1],
            };
            self.heights.push(height);
            filled += 1;
        }
        filled
    }
}

impl SeriesSet for MempoolSet {
    fn label(&self) -> &'static str {
        "mempool"
    }

    fn time(&self) -> &ChartUints {
        &self.time
    }

    fn lengthers(&self) -> Vec<&dyn Lengther> {
        vec![&self.time, &self.size, &self.tx_count, &self.fees]
    }

    fn snip(&mut self, len: usize) {
        self.time.snip(len);
        self.heights.snip(len);
        self.size.snip(len);
        self.tx_count.snip(len);
        self.fees.snip(len);
    }
}

impl Downsample for MempoolSet {
    fn tip(&self) -> u64 {
        self.tip
    }

    fn set_tip(&mut self, tip: u64) {
        self.tip = tip;
    }

    fn heights(&self) -> Option<&ChartUints> {
        Some(&self.heights)
    }

    fn append_bins(&mut self, raw: &Self, ticks: &Ticks) {
        self.time.extend(ticks.boundaries.iter().copied());
        self.heights.extend(ticks.heights.iter().copied());
        for &(start, end) in &ticks.intervals {
            self.size.push(raw.size.avg(start, end));
            self.tx_count.push(raw.tx_count.avg(start, end));
            self.fees.push(raw.fees.avg(start, end));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constants::AN_HOUR;
    use crate::engine::lengthen_set;

    fn record(time: u64, size: u64) -> MempoolRecord {
        MempoolRecord {
            time,
            size,
            tx_count: size / 100,
            total_fee: size as f64 / 1000.0,
        }
    }

    #[test]
    fn test_append_skips_stale_records() {
        let mut set = MempoolSet::default();
        assert_eq!(set.append_records(&[record(10, 1000), record(20, 2000)]), 2);
        assert_eq!(set.append_records(&[record(20, 5), record(30, 3000)]), 1);
        assert_eq!(set.time.0, vec![10, 20, 30]);
        assert_eq!(set.normalize(), 3);
    }

    #[test]
    fn test_backfill_waits_for_following_block() {
        let mut set = MempoolSet::default();
        set.append_records(&[record(5, 1), record(100, 1), record(250, 1)]);

        let filled = set.backfill_heights(&[50, 200], &[7, 8]);
        assert_eq!(filled, 2);
        assert_eq!(set.heights.0, vec![0, 7]);

        set.backfill_heights(&[50, 200, 300], &[7, 8, 9]);
        assert_eq!(set.heights.0, vec![0, 7, 8]);
    }

    #[test]
    fn test_hour_bins_average_members() {
        let mut raw = MempoolSet::default();
        raw.append_records(&[record(0, 100), record(1800, 300), record(3600, 500), record(7300, 0)]);
        raw.backfill_heights(&[0, 8000], &[1, 2]);

        let mut hour = MempoolSet::default();
        assert_eq!(lengthen_set(&raw, &mut hour, AN_HOUR), 2);
        assert_eq!(hour.time.0, vec![0, 3600]);
        assert_eq!(hour.size.0, vec![200, 500]);
        assert_eq!(hour.heights.0, vec![1, 1]);
        assert_eq!(hour.normalize(), 2);
    }
}
