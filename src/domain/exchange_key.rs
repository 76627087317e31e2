use serde::{Deserialize, Serialize};

/// Identifies one exchange candle stream: `exchange-pair-interval`.
#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ExchangeKey {
    pub exchange: String,
    pub pair: String,
    /// Candle width in seconds.
    pub interval: u64,
}

impl ExchangeKey {
    pub fn new(exchange: impl Into<String>, pair: impl Into<String>, interval: u64) -> Self {
        Self {
            exchange: exchange.into(),
            pair: pair.into(),
            interval,
        }
    }

    /// Inverse of `Display`. The exchange name may not contain `-`; the pair may.
    pub fn parse(key: &str) -> Option<Self> {
        let (exchange, rest) = key.split_once('-')?;
        let (pair, interval) = rest.rsplit_once('-')?;
        if exchange.is_empty() || pair.is_empty() {
            return None;
        }
        let interval = interval.parse().ok()?;
        Some(Self::new(exchange, pair, interval))
    }
}

impl std::fmt::Display for ExchangeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.exchange, self.pair, self.interval)
    }
}
