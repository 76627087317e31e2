use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::PropagationRecord;
use crate::models::series_set::{pad_keyed, push_keyed, snip_keyed};
use crate::models::{ChartFloats, ChartUints, Lengther, SeriesSet};

/// Block and vote propagation, indexed by block height.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PropagationSet {
    pub heights: ChartUints,
    /// Local arrival time of each block.
    pub time: ChartUints,
    pub block_delays: ChartFloats,
    pub vote_receive_deviations: ChartFloats,
    /// Arrival deviation per sync source. Sources missing for a block hold 0.
    pub block_propagation: BTreeMap<String, ChartFloats>,
}

impl PropagationSet {
    pub fn append_records(&mut self, records: &[PropagationRecord]) -> usize {
        let mut taken = 0;
        for rec in records {
            if self.heights.last().is_some_and(|&h| rec.height <= h) {
                log::debug!("propagation: skipping stale block {}", rec.height);
                continue;
            }
            let len = self.heights.len();
            self.heights.push(rec.height);
            self.time.push(rec.time);
            self.block_delays.push(rec.block_delay);
            self.vote_receive_deviations.push(rec.vote_receive_deviation);
            for (source, deviation) in &rec.source_deviations {
                push_keyed(&mut self.block_propagation, source, len, *deviation);
            }
            pad_keyed(&mut self.block_propagation, len + 1);
            taken += 1;
        }
        taken
    }
}

impl SeriesSet for PropagationSet {
    fn label(&self) -> &'static str {
        "propagation"
    }

    fn time(&self) -> &ChartUints {
        &self.time
    }

    fn lengthers(&self) -> Vec<&dyn Lengther> {
        let mut lens: Vec<&dyn Lengther> = vec![
            &self.heights,
            &self.time,
            &self.block_delays,
            &self.vote_receive_deviations,
        ];
        lens.extend(self.block_propagation.values().map(|s| s as &dyn Lengther));
        lens
    }

    fn snip(&mut self, len: usize) {
        self.heights.snip(len);
        self.time.snip(len);
        self.block_delays.snip(len);
        self.vote_receive_deviations.snip(len);
        snip_keyed(&mut self.block_propagation, len, ChartFloats::snip);
    }

    /// Propagation is keyed by height, so the newest height identifies its state.
    fn fingerprint(&self) -> u64 {
        self.heights.last().copied().unwrap_or(0)
    }
}
