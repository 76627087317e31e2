use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::BinLevel;
use crate::error::ChartError;
use crate::models::{ChartUints, Lengther, Padded};

/// Check that a group of parallel sequences agree on length.
///
/// The first sequence is the baseline; every disagreement is logged. On a mismatch the
/// error carries the shortest length, which callers snip every member to.
pub fn validate_lengths(lens: &[&dyn Lengther]) -> Result<usize, ChartError> {
    let Some(first) = lens.first() else {
        return Ok(0);
    };
    let first_len = first.length();
    let (mut shortest, mut longest) = (first_len, first_len);

    for (i, seq) in lens.iter().enumerate().skip(1) {
        let len = seq.length();
        if len != first_len {
            log::warn!(
                "validate_lengths: sequence {} has length {}, expected {}",
                i,
                len,
                first_len
            );
        }
        shortest = shortest.min(len);
        longest = longest.max(len);
    }

    if shortest != longest {
        return Err(ChartError::LengthMismatch { shortest, longest });
    }
    Ok(first_len)
}

/// A group of parallel sequences indexed by a shared time axis.
pub trait SeriesSet {
    /// Name used in log lines.
    fn label(&self) -> &'static str;

    /// Index-defining timestamps (heights for the propagation family).
    fn time(&self) -> &ChartUints;

    /// Every member sequence, `time` first.
    fn lengthers(&self) -> Vec<&dyn Lengther>;

    /// Truncate every member to `len`.
    fn snip(&mut self, len: usize);

    /// Last element of the time axis, or 0 when empty.
    fn fingerprint(&self) -> u64 {
        self.time().last().copied().unwrap_or(0)
    }

    fn length(&self) -> usize {
        self.time().length()
    }

    /// Validate member lengths and snip to the shortest on mismatch.
    /// Returns the authoritative length.
    fn normalize(&mut self) -> usize {
        let checked = validate_lengths(&self.lengthers());
        match checked {
            Ok(len) => len,
            Err(ChartError::LengthMismatch { shortest, longest }) => {
                log::warn!(
                    "{}: length mismatch ({} vs {}), truncating to {}",
                    self.label(),
                    shortest,
                    longest,
                    shortest
                );
                self.snip(shortest);
                shortest
            }
            Err(e) => {
                log::error!("{}: {}", self.label(), e);
                self.snip(0);
                0
            }
        }
    }
}

/// Append `value` to the keyed series `key`, creating it (padded) if it is new.
/// `len` is the shared time-axis length before the new point.
pub(crate) fn push_keyed<S: Padded>(
    series: &mut BTreeMap<String, S>,
    key: &str,
    len: usize,
    value: S::Item,
) {
    let seq = series.entry(key.to_string()).or_default();
    seq.pad_to(len);
    seq.push_item(value);
}

/// Pad every keyed series to `len` so keys missing from a poll stay aligned.
pub(crate) fn pad_keyed<S: Padded>(series: &mut BTreeMap<String, S>, len: usize) {
    for seq in series.values_mut() {
        seq.pad_to(len);
    }
}

pub(crate) fn snip_keyed<S>(series: &mut BTreeMap<String, S>, len: usize, snip: impl Fn(&mut S, usize)) {
    for seq in series.values_mut() {
        snip(seq, len);
    }
}

/// Raw set plus its hour and day aggregates.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BinFamily<S> {
    pub raw: S,
    pub hour: S,
    pub day: S,
}

impl<S> BinFamily<S> {
    /// Set materialised for `bin`. Anything but hour/day selects the raw set.
    pub fn get(&self, bin: BinLevel) -> &S {
        match bin {
            BinLevel::Hour => &self.hour,
            BinLevel::Day => &self.day,
            _ => &self.raw,
        }
    }

    pub fn get_mut(&mut self, bin: BinLevel) -> &mut S {
        match bin {
            BinLevel::Hour => &mut self.hour,
            BinLevel::Day => &mut self.day,
            _ => &mut self.raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChartFloats;

    #[test]
    fn test_validate_lengths_reports_shortest() {
        let time = ChartUints::from(vec![1, 2, 3]);
        let value = ChartFloats::from(vec![1.0, 2.0]);
        match validate_lengths(&[&time, &value]) {
            Err(ChartError::LengthMismatch { shortest, longest }) => {
                assert_eq!(shortest, 2);
                assert_eq!(longest, 3);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_lengths_accepts_equal() {
        let time = ChartUints::from(vec![1, 2]);
        let value = ChartFloats::from(vec![1.0, 2.0]);
        assert_eq!(validate_lengths(&[&time, &value]).unwrap(), 2);
        assert_eq!(validate_lengths(&[]).unwrap(), 0);
    }
}
