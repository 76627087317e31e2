//! Time bucketing and the incremental lengthen rule shared by every zoomed family.
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::config::constants::{A_DAY, AN_HOUR};
use crate::models::{ChartUints, Padded, SeriesSet};

/// Bucket boundaries found in a run of raw timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ticks {
    /// Start of each completed bucket.
    pub boundaries: ChartUints,
    /// Height of the first raw point in each bucket. Empty when no heights were given.
    pub heights: ChartUints,
    /// Raw index range `[start, end)` covered by each bucket.
    pub intervals: Vec<(usize, usize)>,
    /// End of the last completed bucket; the next pass resumes from here.
    pub next_tip: u64,
}

impl Ticks {
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Rebase intervals computed on a suffix so they index the full raw set.
    fn shift(&mut self, offset: usize) {
        for (start, end) in self.intervals.iter_mut() {
            *start += offset;
            *end += offset;
        }
    }
}

/// Group `times` into buckets of `period` seconds aligned at `t - t % period`.
///
/// Only buckets that the data has fully crossed are emitted: the bucket containing the
/// last timestamp stays open. A timestamp that falls behind the current bucket is
/// counted in the current bucket rather than reopening an older one.
pub fn generate_ticks(times: &[u64], heights: Option<&[u64]>, period: u64) -> Ticks {
    let mut ticks = Ticks::default();
    if times.len() < 2 || period == 0 {
        return ticks;
    }

    let boundary = |t: u64| t - t % period;
    let mut bucket = boundary(times[0]);
    let mut start = 0;

    for (i, &t) in times.iter().enumerate().skip(1) {
        let next = boundary(t);
        if next <= bucket {
            continue;
        }
        ticks.boundaries.push(bucket);
        ticks.intervals.push((start, i));
        if let Some(heights) = heights {
            ticks.heights.push(heights.get(start).copied().unwrap_or(0));
        }
        ticks.next_tip = bucket + period;
        bucket = next;
        start = i;
    }
    ticks
}

pub fn generate_hour_bin(times: &[u64], heights: Option<&[u64]>) -> Ticks {
    generate_ticks(times, heights, AN_HOUR)
}

pub fn generate_day_bin(times: &[u64], heights: Option<&[u64]>) -> Ticks {
    generate_ticks(times, heights, A_DAY)
}

/// A series set that can be rebuilt at a coarser resolution from its raw counterpart.
pub trait Downsample: SeriesSet {
    /// End of the last bucket already materialised in this (derived) set.
    fn tip(&self) -> u64;

    fn set_tip(&mut self, tip: u64);

    /// Heights aligned with `time`, for families that track them.
    fn heights(&self) -> Option<&ChartUints> {
        None
    }

    /// Append one reduced point per interval of `ticks`, reading values from `raw`.
    fn append_bins(&mut self, raw: &Self, ticks: &Ticks);
}

/// Extend `derived` with every bucket of `raw` completed since `derived`'s tip.
///
/// A no-op unless at least one full period of raw data exists past the tip. Only the
/// unprocessed suffix of `raw` is scanned. Returns the number of points appended.
pub fn lengthen_set<S: Downsample>(raw: &S, derived: &mut S, period: u64) -> usize {
    // The tip must close the last stored bucket; a snipped set resumes from what it kept.
    let kept = derived.time().last().map_or(0, |&t| t + period);
    if derived.tip() != kept {
        log::warn!(
            "{}: tip {} does not match stored buckets, resuming from {}",
            derived.label(),
            derived.tip(),
            kept
        );
        derived.set_tip(kept);
    }

    let times = raw.time();
    let tip = derived.tip();
    let Some(&last) = times.last() else {
        return 0;
    };
    if last < tip.saturating_add(period) {
        return 0;
    }

    let start = times.partition_point(|&t| t < tip);
    let heights = raw
        .heights()
        .map(|h| &h[start.min(h.len())..]);
    let mut ticks = generate_ticks(&times[start..], heights, period);
    if ticks.is_empty() {
        return 0;
    }
    ticks.shift(start);

    derived.append_bins(raw, &ticks);
    derived.set_tip(ticks.next_tip);
    ticks.len()
}

/// Reduce every keyed series of `source` over the tick intervals and append the results
/// to `target`. `prev_len` is the target's time-axis length before this pass.
pub(crate) fn reduce_keyed<S, F>(
    target: &mut BTreeMap<String, S>,
    source: &BTreeMap<String, S>,
    ticks: &Ticks,
    prev_len: usize,
    reduce: F,
) where
    S: Padded + Sync,
    S::Item: Send,
    F: Fn(&S, usize, usize) -> S::Item + Sync,
{
    let reduced: Vec<(&String, Vec<S::Item>)> = source
        .par_iter()
        .map(|(key, seq)| {
            let values = ticks
                .intervals
                .iter()
                .map(|&(start, end)| reduce(seq, start, end))
                .collect();
            (key, values)
        })
        .collect();

    for (key, values) in reduced {
        let seq = target.entry(key.clone()).or_default();
        seq.pad_to(prev_len);
        for value in values {
            seq.push_item(value);
        }
    }
    for seq in target.values_mut() {
        seq.pad_to(prev_len + ticks.len());
    }
}

/// Seconds between consecutive timestamps. A clock that steps backwards yields 0.
pub fn block_times(times: &[u64]) -> ChartUints {
    times
        .windows(2)
        .map(|pair| pair[1].saturating_sub(pair[0]))
        .collect()
}

/// Mean gap between consecutive timestamps inside each tick interval.
pub fn avg_block_times(ticks: &Ticks, times: &[u64]) -> ChartUints {
    ticks
        .intervals
        .iter()
        .map(|&(start, end)| {
            let end = end.min(times.len());
            let gaps: Vec<u64> = (start.max(1)..end)
                .map(|i| times[i].saturating_sub(times[i - 1]))
                .collect();
            if gaps.is_empty() {
                0
            } else {
                gaps.iter().sum::<u64>() / gaps.len() as u64
            }
        })
        .collect()
}

/// Running total.
pub fn accumulate(values: &[u64]) -> ChartUints {
    values
        .iter()
        .scan(0u64, |total, v| {
            *total = total.saturating_add(*v);
            Some(*total)
        })
        .collect()
}
