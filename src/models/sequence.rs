//! Typed chart sequences.
//!
//! Every series in a series set is one of these newtypes. They serialize as plain JSON
//! arrays (invalid nullable entries become `null`) and share the [`Lengther`] trait so
//! the encoder and the length validator can treat them uniformly.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::Range;

/// Anything with a length that can be rendered as a JSON array prefix.
pub trait Lengther {
    fn length(&self) -> usize;

    /// JSON array of the first `len` elements (clamped to the sequence length).
    fn encode_prefix(&self, len: usize) -> serde_json::Result<Value>;
}

/// Element-wise validity for sequences that may hold missing values.
pub trait NullData: Lengther {
    fn valid(&self, i: usize) -> bool;
    fn is_zero(&self, i: usize) -> bool;
    /// Base-10 (uints) or `%.6f` (floats) rendering. Empty for invalid entries.
    fn value_string(&self, i: usize) -> String;
}

/// Sequences that can be extended with a filler value to keep keyed series aligned.
pub trait Padded: Default {
    type Item;

    /// Extend with filler up to `len`. Never shortens.
    fn pad_to(&mut self, len: usize);

    fn push_item(&mut self, value: Self::Item);
}

/// Clamp `[start, end)` to a sequence of `len` elements. `None` for an empty range.
fn span(len: usize, start: usize, end: usize) -> Option<Range<usize>> {
    let end = end.min(len);
    (end > start).then_some(start..end)
}

macro_rules! chart_sequence {
    ($(#[$meta:meta])* $name:ident, $elem:ty, $filler:expr) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
        #[serde(transparent)]
        pub struct $name(pub Vec<$elem>);

        impl $name {
            pub fn new() -> Self {
                Self(Vec::new())
            }

            pub fn with_capacity(capacity: usize) -> Self {
                Self(Vec::with_capacity(capacity))
            }

            /// Copy of the first `n` elements.
            pub fn truncate(&self, n: usize) -> Self {
                Self(self.0[..n.min(self.0.len())].to_vec())
            }

            /// Drop everything past the first `n` elements in place.
            pub fn snip(&mut self, n: usize) {
                self.0.truncate(n);
            }

            pub fn push(&mut self, value: $elem) {
                self.0.push(value);
            }

            pub fn extend<I: IntoIterator<Item = $elem>>(&mut self, values: I) {
                self.0.extend(values);
            }
        }

        impl std::ops::Deref for $name {
            type Target = [$elem];

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<Vec<$elem>> for $name {
            fn from(values: Vec<$elem>) -> Self {
                Self(values)
            }
        }

        impl FromIterator<$elem> for $name {
            fn from_iter<I: IntoIterator<Item = $elem>>(iter: I) -> Self {
                Self(iter.into_iter().collect())
            }
        }

        impl Padded for $name {
            type Item = $elem;

            fn pad_to(&mut self, len: usize) {
                if self.0.len() < len {
                    self.0.resize(len, $filler);
                }
            }

            fn push_item(&mut self, value: $elem) {
                self.0.push(value);
            }
        }

        impl Lengther for $name {
            fn length(&self) -> usize {
                self.0.len()
            }

            fn encode_prefix(&self, len: usize) -> serde_json::Result<Value> {
                serde_json::to_value(&self.0[..len.min(self.0.len())])
            }
        }
    };
}

chart_sequence!(
    /// Unsigned integers: heights, timestamps, counts, atoms.
    ChartUints,
    u64,
    0
);
chart_sequence!(ChartFloats, f64, 0.0);
chart_sequence!(
    /// Unsigned integers that may be missing at a given index.
    ChartNullUints,
    Option<u64>,
    None
);
chart_sequence!(ChartNullFloats, Option<f64>, None);
chart_sequence!(ChartStrings, String, String::new());

impl ChartUints {
    /// Integer mean over `[start, end)`. Zero for an empty range.
    pub fn avg(&self, start: usize, end: usize) -> u64 {
        match span(self.len(), start, end) {
            Some(r) => {
                let n = r.len() as u64;
                self.sum(r.start, r.end) / n
            }
            None => 0,
        }
    }

    pub fn sum(&self, start: usize, end: usize) -> u64 {
        span(self.len(), start, end)
            .map(|r| self.0[r].iter().fold(0u64, |acc, v| acc.saturating_add(*v)))
            .unwrap_or(0)
    }

    /// Last value inside `[start, end)`, for quantities that are already cumulative.
    pub fn last_in(&self, start: usize, end: usize) -> u64 {
        span(self.len(), start, end)
            .map(|r| self.0[r.end - 1])
            .unwrap_or(0)
    }
}

impl ChartFloats {
    pub fn avg(&self, start: usize, end: usize) -> f64 {
        match span(self.len(), start, end) {
            Some(r) => {
                let n = r.len() as f64;
                self.sum(r.start, r.end) / n
            }
            None => 0.0,
        }
    }

    pub fn sum(&self, start: usize, end: usize) -> f64 {
        span(self.len(), start, end)
            .map(|r| self.0[r].iter().sum())
            .unwrap_or(0.0)
    }

    pub fn first_in(&self, start: usize, end: usize) -> f64 {
        span(self.len(), start, end)
            .map(|r| self.0[r.start])
            .unwrap_or(0.0)
    }

    pub fn last_in(&self, start: usize, end: usize) -> f64 {
        span(self.len(), start, end)
            .map(|r| self.0[r.end - 1])
            .unwrap_or(0.0)
    }

    pub fn max_in(&self, start: usize, end: usize) -> f64 {
        span(self.len(), start, end)
            .map(|r| self.0[r].iter().copied().fold(f64::MIN, f64::max))
            .unwrap_or(0.0)
    }

    pub fn min_in(&self, start: usize, end: usize) -> f64 {
        span(self.len(), start, end)
            .map(|r| self.0[r].iter().copied().fold(f64::MAX, f64::min))
            .unwrap_or(0.0)
    }
}

// Nullable reductions count a missing entry as zero but still divide by the full
// range width. The result is valid when at least one entry in the range was.
impl ChartNullUints {
    pub fn avg(&self, start: usize, end: usize) -> Option<u64> {
        let r = span(self.len(), start, end)?;
        let n = r.len() as u64;
        self.sum(r.start, r.end).map(|total| total / n)
    }

    pub fn sum(&self, start: usize, end: usize) -> Option<u64> {
        let r = span(self.len(), start, end)?;
        let values = &self.0[r];
        values.iter().any(Option::is_some).then(|| {
            values
                .iter()
                .fold(0u64, |acc, v| acc.saturating_add(v.unwrap_or(0)))
        })
    }

    /// String form for CSV output; missing entries become `NaN`.
    pub fn to_chart_strings(&self) -> ChartStrings {
        self.0
            .iter()
            .map(|v| v.map_or_else(|| "NaN".to_string(), |v| v.to_string()))
            .collect()
    }
}

impl ChartNullFloats {
    pub fn avg(&self, start: usize, end: usize) -> Option<f64> {
        let r = span(self.len(), start, end)?;
        let n = r.len() as f64;
        self.sum(r.start, r.end).map(|total| total / n)
    }

    pub fn sum(&self, start: usize, end: usize) -> Option<f64> {
        let r = span(self.len(), start, end)?;
        let values = &self.0[r];
        values
            .iter()
            .any(Option::is_some)
            .then(|| values.iter().map(|v| v.unwrap_or(0.0)).sum())
    }

    pub fn to_chart_strings(&self) -> ChartStrings {
        self.0
            .iter()
            .map(|v| v.map_or_else(|| "NaN".to_string(), |v| format!("{:.6}", v)))
            .collect()
    }
}

impl NullData for ChartNullUints {
    fn valid(&self, i: usize) -> bool {
        matches!(self.0.get(i), Some(Some(_)))
    }

    fn is_zero(&self, i: usize) -> bool {
        matches!(self.0.get(i), Some(Some(0)) | Some(None) | None)
    }

    fn value_string(&self, i: usize) -> String {
        match self.0.get(i) {
            Some(Some(v)) => v.to_string(),
            _ => String::new(),
        }
    }
}

impl NullData for ChartNullFloats {
    fn valid(&self, i: usize) -> bool {
        matches!(self.0.get(i), Some(Some(_)))
    }

    fn is_zero(&self, i: usize) -> bool {
        match self.0.get(i) {
            Some(Some(v)) => *v == 0.0,
            _ => true,
        }
    }

    fn value_string(&self, i: usize) -> String {
        match self.0.get(i) {
            Some(Some(v)) => format!("{:.6}", v),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avg_and_sum_over_half_open_range() {
        let seq = ChartUints::from(vec![2, 4, 6, 8]);
        assert_eq!(seq.avg(0, 2), 3);
        assert_eq!(seq.sum(1, 4), 18);
        assert_eq!(seq.avg(2, 2), 0);
        assert_eq!(seq.sum(3, 1), 0);
    }

    #[test]
    fn test_range_is_clamped_to_length() {
        let seq = ChartFloats::from(vec![1.0, 3.0]);
        assert_eq!(seq.avg(0, 10), 2.0);
        assert_eq!(seq.max_in(0, 10), 3.0);
        assert_eq!(seq.min_in(5, 10), 0.0);
    }

    #[test]
    fn test_truncate_copies_and_snip_mutates() {
        let mut seq = ChartUints::from(vec![1, 2, 3]);
        let short = seq.truncate(2);
        assert_eq!(short.0, vec![1, 2]);
        assert_eq!(seq.length(), 3);
        assert_eq!(seq.truncate(10).length(), 3);
        seq.snip(1);
        assert_eq!(seq.0, vec![1]);
    }

    #[test]
    fn test_nullable_avg_counts_missing_as_zero() {
        let seq = ChartNullUints::from(vec![Some(10), None, Some(20), None]);
        assert_eq!(seq.avg(0, 4), Some(7));
        assert_eq!(seq.avg(1, 2), None);
        assert_eq!(seq.sum(0, 3), Some(30));
    }

    #[test]
    fn test_null_float_strings() {
        let seq = ChartNullFloats::from(vec![Some(1.5), None]);
        assert_eq!(seq.to_chart_strings().0, vec!["1.500000", "NaN"]);
        assert!(seq.valid(0));
        assert!(!seq.valid(1));
        assert_eq!(seq.value_string(0), "1.500000");
    }

    #[test]
    fn test_pad_to_never_shortens() {
        let mut seq = ChartNullUints::from(vec![Some(1)]);
        seq.pad_to(3);
        assert_eq!(seq.0, vec![Some(1), None, None]);
        seq.pad_to(1);
        assert_eq!(seq.length(), 3);
    }

    #[test]
    fn test_encode_prefix_renders_nulls() {
        let seq = ChartNullUints::from(vec![Some(1), None, Some(3)]);
        let value = seq.encode_prefix(2).unwrap();
        assert_eq!(value, serde_json::json!([1, null]));
    }
}
