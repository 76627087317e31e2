//! JSON payload builders: the generic key/array encoder and the CSV summary.
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::constants::DEFAULT_ENCODE_KEYS;
use crate::error::ChartError;
use crate::models::{ChartUints, Lengther, NullData};
use crate::utils::{epoch_sec_to_datetime, epoch_sec_to_utc_string};

/// Encode parallel sequences as one JSON object of equal-length arrays.
///
/// Sequence `i` is stored under `keys[i]`, or `keys[i % n] + (i / n)` once the keys run
/// out (`x, y, z, x1, y1, z1, ...` with the default keys). Every array is cut to the
/// shortest sequence.
pub fn encode(keys: Option<&[&str]>, sets: &[&dyn Lengther]) -> Result<Value, ChartError> {
    if sets.is_empty() {
        return Err(ChartError::EmptyEncode);
    }
    let keys = match keys {
        Some(keys) if !keys.is_empty() => keys,
        _ => &DEFAULT_ENCODE_KEYS[..],
    };
    let len = sets.iter().map(|s| s.length()).min().unwrap_or(0);

    let mut out = Map::with_capacity(sets.len());
    for (i, set) in sets.iter().enumerate() {
        let key = if i < keys.len() {
            keys[i].to_string()
        } else {
            format!("{}{}", keys[i % keys.len()], i / keys.len())
        };
        out.insert(key, set.encode_prefix(len)?);
    }
    Ok(Value::Object(out))
}

/// Tabular payload for charts with a variable number of sources.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CsvChart {
    pub csv: String,
    pub min_date: Option<DateTime<Utc>>,
    pub max_date: Option<DateTime<Utc>>,
}

/// One row per time index where at least one series holds a valid, non-zero value.
/// Invalid cells render as `NaN`. The date bounds are the first and last rows emitted.
pub fn csv_summary(time: &ChartUints, names: &[&str], series: &[&dyn NullData]) -> CsvChart {
    let mut csv = format!("Date,{}\n", names.iter().join(","));
    let mut bounds: Option<(u64, u64)> = None;

    for (i, &t) in time.iter().enumerate() {
        if !series.iter().any(|s| s.valid(i) && !s.is_zero(i)) {
            continue;
        }
        let mut cells = series.iter().map(|s| {
            if s.valid(i) {
                s.value_string(i)
            } else {
                "NaN".to_string()
            }
        });
        csv.push_str(&epoch_sec_to_utc_string(t));
        csv.push(',');
        csv.push_str(&cells.join(","));
        csv.push('\n');

        bounds = Some(match bounds {
            Some((min, _)) => (min, t),
            None => (t, t),
        });
    }

    CsvChart {
        csv,
        min_date: bounds.and_then(|(min, _)| epoch_sec_to_datetime(min)),
        max_date: bounds.and_then(|(_, max)| epoch_sec_to_datetime(max)),
    }
}
