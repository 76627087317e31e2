use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{AxisType, VspRecord};
use crate::engine::{Downsample, Ticks};
use crate::models::{ChartNullFloats, ChartNullUints, ChartUints, Lengther, NullData, Padded, SeriesSet};

/// Every tracked quantity for one VSP.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct VspSeries {
    pub immature: ChartNullUints,
    pub live: ChartNullUints,
    pub voted: ChartNullUints,
    pub missed: ChartNullUints,
    pub pool_fees: ChartNullFloats,
    pub proportion_live: ChartNullFloats,
    pub proportion_missed: ChartNullFloats,
    pub user_count: ChartNullUints,
    pub users_active: ChartNullUints,
}

impl VspSeries {
    fn members(&self) -> [&dyn Lengther; 9] {
        [
            &self.immature,
            &self.live,
            &self.voted,
            &self.missed,
            &self.pool_fees,
            &self.proportion_live,
            &self.proportion_missed,
            &self.user_count,
            &self.users_active,
        ]
    }

    fn pad_to(&mut self, len: usize) {
        self.immature.pad_to(len);
        self.live.pad_to(len);
        self.voted.pad_to(len);
        self.missed.pad_to(len);
        self.pool_fees.pad_to(len);
        self.proportion_live.pad_to(len);
        self.proportion_missed.pad_to(len);
        self.user_count.pad_to(len);
        self.users_active.pad_to(len);
    }

    fn snip(&mut self, len: usize) {
        self.immature.snip(len);
        self.live.snip(len);
        self.voted.snip(len);
        self.missed.snip(len);
        self.pool_fees.snip(len);
        self.proportion_live.snip(len);
        self.proportion_missed.snip(len);
        self.user_count.snip(len);
        self.users_active.snip(len);
    }

    fn push_record(&mut self, rec: &VspRecord) {
        self.immature.push(rec.immature);
        self.live.push(rec.live);
        self.voted.push(rec.voted);
        self.missed.push(rec.missed);
        self.pool_fees.push(rec.pool_fees);
        self.proportion_live.push(rec.proportion_live);
        self.proportion_missed.push(rec.proportion_missed);
        self.user_count.push(rec.user_count);
        self.users_active.push(rec.users_active);
    }

    fn reduced(&self, ticks: &Ticks) -> Self {
        let mut out = Self::default();
        for &(s, e) in &ticks.intervals {
            out.immature.push(self.immature.avg(s, e));
            out.live.push(self.live.avg(s, e));
            out.voted.push(self.voted.avg(s, e));
            out.missed.push(self.missed.avg(s, e));
            out.pool_fees.push(self.pool_fees.avg(s, e));
            out.proportion_live.push(self.proportion_live.avg(s, e));
            out.proportion_missed.push(self.proportion_missed.avg(s, e));
            out.user_count.push(self.user_count.avg(s, e));
            out.users_active.push(self.users_active.avg(s, e));
        }
        out
    }

    fn extend_from(&mut self, other: Self) {
        self.immature.extend(other.immature.0);
        self.live.extend(other.live.0);
        self.voted.extend(other.voted.0);
        self.missed.extend(other.missed.0);
        self.pool_fees.extend(other.pool_fees.0);
        self.proportion_live.extend(other.proportion_live.0);
        self.proportion_missed.extend(other.proportion_missed.0);
        self.user_count.extend(other.user_count.0);
        self.users_active.extend(other.users_active.0);
    }

    /// The series plotted on `axis`, if it is a VSP axis.
    pub fn axis(&self, axis: AxisType) -> Option<&dyn NullData> {
        let series: &dyn NullData = match axis {
            AxisType::Immature => &self.immature,
            AxisType::Live => &self.live,
            AxisType::Voted => &self.voted,
            AxisType::Missed => &self.missed,
            AxisType::PoolFees => &self.pool_fees,
            AxisType::ProportionLive => &self.proportion_live,
            AxisType::ProportionMissed => &self.proportion_missed,
            AxisType::UserCount => &self.user_count,
            AxisType::UsersActive => &self.users_active,
            _ => return None,
        };
        Some(series)
    }
}

/// Ticket statistics per VSP.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct VspSet {
    pub time: ChartUints,
    pub vsps: BTreeMap<String, VspSeries>,
    pub tip: u64,
}

impl VspSet {
    pub fn append_records(&mut self, records: &[VspRecord]) -> usize {
        let last = self.fingerprint();
        let mut fresh: Vec<&VspRecord> = records
            .iter()
            .filter(|r| self.time.is_empty() || r.time > last)
            .collect();
        fresh.sort_by_key(|r| r.time);

        let mut taken = 0;
        for rec in fresh {
            if self.time.last() != Some(&rec.time) {
                let len = self.time.len();
                self.time.push(rec.time);
                for series in self.vsps.values_mut() {
                    series.pad_to(len + 1);
                }
                taken += 1;
            }
            let len = self.time.len();
            let series = self.vsps.entry(rec.vsp.clone()).or_default();
            series.pad_to(len - 1);
            // A duplicate VSP inside one poll replaces the padded entry.
            series.snip(len - 1);
            series.push_record(rec);
        }
        taken
    }
}

impl SeriesSet for VspSet {
    fn label(&self) -> &'static str {
        "vsp"
    }

    fn time(&self) -> &ChartUints {
        &self.time
    }

    fn lengthers(&self) -> Vec<&dyn Lengther> {
        let mut lens: Vec<&dyn Lengther> = vec![&self.time];
        for series in self.vsps.values() {
            lens.extend(series.members());
        }
        lens
    }

    fn snip(&mut self, len: usize) {
        self.time.snip(len);
        for series in self.vsps.values_mut() {
            series.snip(len);
        }
    }
}

impl Downsample for VspSet {
    fn tip(&self) -> u64 {
        self.tip
    }

    fn set_tip(&mut self, tip: u64) {
        self.tip = tip;
    }

    fn append_bins(&mut self, raw: &Self, ticks: &Ticks) {
        let prev_len = self.time.len();
        let reduced: Vec<(&String, VspSeries)> = raw
            .vsps
            .par_iter()
            .map(|(name, series)| (name, series.reduced(ticks)))
            .collect();

        for (name, values) in reduced {
            let series = self.vsps.entry(name.clone()).or_default();
            series.pad_to(prev_len);
            series.extend_from(values);
        }
        self.time.extend(ticks.boundaries.iter().copied());
        for series in self.vsps.values_mut() {
            series.pad_to(self.time.len());
        }
    }
}
