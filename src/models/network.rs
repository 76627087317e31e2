use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::NetworkSnapshotRecord;
use crate::engine::{Downsample, Ticks, reduce_keyed};
use crate::models::series_set::{pad_keyed, push_keyed, snip_keyed};
use crate::models::{ChartUints, Lengther, SeriesSet};

/// Total and reachable node counts from the network crawler.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NodeCountSet {
    pub time: ChartUints,
    pub nodes: ChartUints,
    pub reachable_nodes: ChartUints,
    pub tip: u64,
}

impl NodeCountSet {
    pub fn append_records(&mut self, records: &[NetworkSnapshotRecord]) -> usize {
        let mut taken = 0;
        for rec in records {
            if self.time.last().is_some_and(|&t| rec.time <= t) {
                continue;
            }
            self.time.push(rec.time);
            self.nodes.push(rec.nodes);
            self.reachable_nodes.push(rec.reachable_nodes);
            taken += 1;
        }
        taken
    }
}

impl SeriesSet for NodeCountSet {
    fn label(&self) -> &'static str {
        "nodes"
    }

    fn time(&self) -> &ChartUints {
        &self.time
    }

    fn lengthers(&self) -> Vec<&dyn Lengther> {
        vec![&self.time, &self.nodes, &self.reachable_nodes]
    }

    fn snip(&mut self, len: usize) {
        self.time.snip(len);
        self.nodes.snip(len);
        self.reachable_nodes.snip(len);
    }
}

impl Downsample for NodeCountSet {
    fn tip(&self) -> u64 {
        self.tip
    }

    fn set_tip(&mut self, tip: u64) {
        self.tip = tip;
    }

    fn append_bins(&mut self, raw: &Self, ticks: &Ticks) {
        self.time.extend(ticks.boundaries.iter().copied());
        for &(start, end) in &ticks.intervals {
            self.nodes.push(raw.nodes.avg(start, end));
            self.reachable_nodes.push(raw.reachable_nodes.avg(start, end));
        }
    }
}

/// Node counts broken down by a label (country or user agent), with its own dates.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct KeyedCountSet {
    pub time: ChartUints,
    pub counts: BTreeMap<String, ChartUints>,
    pub tip: u64,
}

impl KeyedCountSet {
    /// Append one breakdown. Empty breakdowns are skipped so a lagging lookup does not
    /// add a row of zeros.
    pub fn append_breakdown(&mut self, time: u64, counts: &BTreeMap<String, u64>) -> bool {
        if counts.is_empty() || self.time.last().is_some_and(|&t| time <= t) {
            return false;
        }
        let len = self.time.len();
        self.time.push(time);
        for (key, count) in counts {
            push_keyed(&mut self.counts, key, len, *count);
        }
        pad_keyed(&mut self.counts, len + 1);
        true
    }
}

impl SeriesSet for KeyedCountSet {
    fn label(&self) -> &'static str {
        "node-breakdown"
    }

    fn time(&self) -> &ChartUints {
        &self.time
    }

    fn lengthers(&self) -> Vec<&dyn Lengther> {
        let mut lens: Vec<&dyn Lengther> = vec![&self.time];
        lens.extend(self.counts.values().map(|s| s as &dyn Lengther));
        lens
    }

    fn snip(&mut self, len: usize) {
        self.time.snip(len);
        snip_keyed(&mut self.counts, len, ChartUints::snip);
    }
}

impl Downsample for KeyedCountSet {
    fn tip(&self) -> u64 {
        self.tip
    }

    fn set_tip(&mut self, tip: u64) {
        self.tip = tip;
    }

    fn append_bins(&mut self, raw: &Self, ticks: &Ticks) {
        let prev_len = self.time.len();
        reduce_keyed(&mut self.counts, &raw.counts, ticks, prev_len, |s, a, b| s.avg(a, b));
        self.time.extend(ticks.boundaries.iter().copied());
    }
}
