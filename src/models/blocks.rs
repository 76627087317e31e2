use serde::{Deserialize, Serialize};

use crate::domain::{BlockRecord, WindowRecord};
use crate::engine::{Downsample, Ticks};
use crate::models::{ChartFloats, ChartUints, Lengther, SeriesSet};

/// Per-block chain statistics. The same shape holds the daily aggregates, where each
/// height is the first block of its day.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BlockSet {
    pub heights: ChartUints,
    pub time: ChartUints,
    pub pool_size: ChartUints,
    pub pool_value: ChartUints,
    pub block_size: ChartUints,
    pub tx_count: ChartUints,
    pub new_atoms: ChartUints,
    pub chainwork: ChartUints,
    pub fees: ChartUints,
    pub tip: u64,
}

impl BlockSet {
    pub fn append_records(&mut self, records: &[BlockRecord]) -> usize {
        let mut taken = 0;
        for rec in records {
            if self.heights.last().is_some_and(|&h| rec.height <= h) {
                log::debug!("blocks: skipping stale block {}", rec.height);
                continue;
            }
            self.heights.push(rec.height);
            self.time.push(rec.time);
            self.pool_size.push(rec.pool_size);
            self.pool_value.push(rec.pool_value);
            self.block_size.push(rec.block_size);
            self.tx_count.push(rec.tx_count);
            self.new_atoms.push(rec.new_atoms);
            self.chainwork.push(rec.chainwork);
            self.fees.push(rec.fees);
            taken += 1;
        }
        taken
    }

    pub fn tip_height(&self) -> u64 {
        self.heights.last().copied().unwrap_or(0)
    }
}

impl SeriesSet for BlockSet {
    fn label(&self) -> &'static str {
        "blocks"
    }

    fn time(&self) -> &ChartUints {
        &self.time
    }

    fn lengthers(&self) -> Vec<&dyn Lengther> {
        vec![
            &self.time,
            &self.heights,
            &self.pool_size,
            &self.pool_value,
            &self.block_size,
            &self.tx_count,
            &self.new_atoms,
            &self.chainwork,
            &self.fees,
        ]
    }

    fn snip(&mut self, len: usize) {
        self.heights.snip(len);
        self.time.snip(len);
        self.pool_size.snip(len);
        self.pool_value.snip(len);
        self.block_size.snip(len);
        self.tx_count.snip(len);
        self.new_atoms.snip(len);
        self.chainwork.snip(len);
        self.fees.snip(len);
    }
}

impl Downsample for BlockSet {
    fn tip(&self) -> u64 {
        self.tip
    }

    fn set_tip(&mut self, tip: u64) {
        self.tip = tip;
    }

    fn heights(&self) -> Option<&ChartUints> {
        Some(&self.heights)
    }

    // Pool figures are levels and get averaged; per-block quantities are summed;
    // chainwork is already cumulative so the day keeps its last value.
    fn append_bins(&mut self, raw: &Self, ticks: &Ticks) {
        self.time.extend(ticks.boundaries.iter().copied());
        self.heights.extend(ticks.heights.iter().copied());
        for &(start, end) in &ticks.intervals {
            self.pool_size.push(raw.pool_size.avg(start, end));
            self.pool_value.push(raw.pool_value.avg(start, end));
            self.block_size.push(raw.block_size.sum(start, end));
            self.tx_count.push(raw.tx_count.sum(start, end));
            self.new_atoms.push(raw.new_atoms.sum(start, end));
            self.chainwork.push(raw.chainwork.last_in(start, end));
            self.fees.push(raw.fees.sum(start, end));
        }
    }
}

/// Ticket price window statistics.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WindowSet {
    pub time: ChartUints,
    pub pow_diff: ChartFloats,
    pub ticket_price: ChartUints,
    pub stake_count: ChartUints,
    pub missed_votes: ChartUints,
}

impl WindowSet {
    pub fn append_records(&mut self, records: &[WindowRecord]) -> usize {
        let mut taken = 0;
        for rec in records {
            if self.time.last().is_some_and(|&t| rec.time <= t) {
                continue;
            }
            self.time.push(rec.time);
            self.pow_diff.push(rec.pow_diff);
            self.ticket_price.push(rec.ticket_price);
            self.stake_count.push(rec.stake_count);
            self.missed_votes.push(rec.missed_votes);
            taken += 1;
        }
        taken
    }
}

impl SeriesSet for WindowSet {
    fn label(&self) -> &'static str {
        "windows"
    }

    fn time(&self) -> &ChartUints {
        &self.time
    }

    fn lengthers(&self) -> Vec<&dyn Lengther> {
        vec![
            &self.time,
            &self.pow_diff,
            &self.ticket_price,
            &self.stake_count,
            &self.missed_votes,
        ]
    }

    fn snip(&mut self, len: usize) {
        self.time.snip(len);
        self.pow_diff.snip(len);
        self.ticket_price.snip(len);
        self.stake_count.snip(len);
        self.missed_votes.snip(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constants::A_DAY;
    use crate::engine::lengthen_set;

    fn block(height: u64, time: u64) -> BlockRecord {
        BlockRecord {
            height,
            time,
            pool_size: height * 10,
            block_size: 1000,
            tx_count: 5,
            chainwork: height * 100,
            fees: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_days_sum_per_block_quantities() {
        let mut blocks = BlockSet::default();
        blocks.append_records(&[
            block(1, 100),
            block(2, 40_000),
            block(3, 80_000),
            block(4, 90_000),
        ]);
        let mut days = BlockSet::default();
        assert_eq!(lengthen_set(&blocks, &mut days, A_DAY), 1);
        assert_eq!(days.heights.0, vec![1]);
        assert_eq!(days.block_size.0, vec![3000]);
        assert_eq!(days.tx_count.0, vec![15]);
        assert_eq!(days.pool_size.0, vec![20]);
        assert_eq!(days.chainwork.0, vec![300]);
        assert_eq!(days.normalize(), 1);
    }

    #[test]
    fn test_window_append_is_chronological() {
        let mut windows = WindowSet::default();
        let rec = |time| WindowRecord {
            time,
            ticket_price: 100,
            ..Default::default()
        };
        assert_eq!(windows.append_records(&[rec(10), rec(5), rec(20)]), 2);
        assert_eq!(windows.normalize(), 2);
    }
}
