use serde::{Deserialize, Serialize};

use crate::domain::{AxisType, ExchangeTick};
use crate::engine::{Downsample, Ticks};
use crate::models::{ChartFloats, ChartUints, Lengther, SeriesSet};

/// Candles for one exchange key.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExchangeTickSet {
    pub time: ChartUints,
    pub open: ChartFloats,
    pub high: ChartFloats,
    pub low: ChartFloats,
    pub close: ChartFloats,
    pub tip: u64,
}

impl ExchangeTickSet {
    pub fn append_ticks<'a>(&mut self, ticks: impl IntoIterator<Item = &'a ExchangeTick>) -> usize {
        let mut taken = 0;
        for tick in ticks {
            if self.time.last().is_some_and(|&t| tick.time <= t) {
                continue;
            }
            self.time.push(tick.time);
            self.open.push(tick.open);
            self.high.push(tick.high);
            self.low.push(tick.low);
            self.close.push(tick.close);
            taken += 1;
        }
        taken
    }

    /// Price series for an exchange axis. Anything else is the close.
    pub fn by_axis(&self, axis: AxisType) -> &ChartFloats {
        match axis {
            AxisType::Open => &self.open,
            AxisType::High => &self.high,
            AxisType::Low => &self.low,
            _ => &self.close,
        }
    }
}

impl SeriesSet for ExchangeTickSet {
    fn label(&self) -> &'static str {
        "exchange"
    }

    fn time(&self) -> &ChartUints {
        &self.time
    }

    fn lengthers(&self) -> Vec<&dyn Lengther> {
        vec![&self.time, &self.open, &self.high, &self.low, &self.close]
    }

    fn snip(&mut self, len: usize) {
        self.time.snip(len);
        self.open.snip(len);
        self.high.snip(len);
        self.low.snip(len);
        self.close.snip(len);
    }
}

impl Downsample for ExchangeTickSet {
    fn tip(&self) -> u64 {
        self.tip
    }

    fn set_tip(&mut self, tip: u64) {
        self.tip = tip;
    }

    fn append_bins(&mut self, raw: &Self, ticks: &Ticks) {
        self.time.extend(ticks.boundaries.iter().copied());
        for &(start, end) in &ticks.intervals {
            self.open.push(raw.open.first_in(start, end));
            self.high.push(raw.high.max_in(start, end));
            self.low.push(raw.low.min_in(start, end));
            self.close.push(raw.close.last_in(start, end));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constants::AN_HOUR;
    use crate::domain::ExchangeKey;
    use crate::engine::lengthen_set;

    fn candle(time: u64, open: f64, high: f64, low: f64, close: f64) -> ExchangeTick {
        ExchangeTick {
            key: ExchangeKey::new("binance", "DCR/BTC", 1800),
            time,
            open,
            high,
            low,
            close,
        }
    }

    #[test]
    fn test_hourly_candles_merge_ohlc() {
        let mut raw = ExchangeTickSet::default();
        raw.append_ticks(&[
            candle(0, 1.0, 2.0, 0.5, 1.5),
            candle(1800, 1.5, 3.0, 1.0, 2.5),
            candle(3600, 2.5, 2.6, 2.4, 2.5),
        ]);
        let mut hour = ExchangeTickSet::default();
        assert_eq!(lengthen_set(&raw, &mut hour, AN_HOUR), 1);
        assert_eq!(hour.open.0, vec![1.0]);
        assert_eq!(hour.high.0, vec![3.0]);
        assert_eq!(hour.low.0, vec![0.5]);
        assert_eq!(hour.close.0, vec![2.5]);
        assert_eq!(hour.by_axis(AxisType::High).0, vec![3.0]);
    }
}
