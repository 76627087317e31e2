// Raw records handed over by the collectors. Timestamps are Unix seconds.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ExchangeKey;

/// One mempool observation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MempoolRecord {
    pub time: u64,
    pub size: u64,
    pub tx_count: u64,
    pub total_fee: f64,
}

/// Propagation measurements for one block.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PropagationRecord {
    pub height: u64,
    pub time: u64,
    /// Seconds between block timestamp and its arrival locally.
    pub block_delay: f64,
    /// Seconds between block arrival and the arrival of its votes.
    pub vote_receive_deviation: f64,
    /// Arrival deviation as reported by each sync source.
    pub source_deviations: BTreeMap<String, f64>,
}

/// A pool's hashrate and worker count at one poll.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PowRecord {
    pub time: u64,
    pub source: String,
    pub hashrate: Option<u64>,
    pub workers: Option<u64>,
}

/// One VSP's ticket statistics at one poll.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct VspRecord {
    pub time: u64,
    pub vsp: String,
    pub immature: Option<u64>,
    pub live: Option<u64>,
    pub voted: Option<u64>,
    pub missed: Option<u64>,
    pub pool_fees: Option<f64>,
    pub proportion_live: Option<f64>,
    pub proportion_missed: Option<f64>,
    pub user_count: Option<u64>,
    pub users_active: Option<u64>,
}

/// One exchange candle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExchangeTick {
    pub key: ExchangeKey,
    pub time: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Network crawler output for one snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NetworkSnapshotRecord {
    pub time: u64,
    pub nodes: u64,
    pub reachable_nodes: u64,
    /// Node count per country. May be empty when the geo lookup lags behind.
    pub locations: BTreeMap<String, u64>,
    /// Node count per user agent.
    pub versions: BTreeMap<String, u64>,
}

/// Per-block chain statistics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BlockRecord {
    pub height: u64,
    pub time: u64,
    pub pool_size: u64,
    pub pool_value: u64,
    pub block_size: u64,
    pub tx_count: u64,
    pub new_atoms: u64,
    pub chainwork: u64,
    pub fees: u64,
}

/// Per-window ticket statistics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct WindowRecord {
    pub time: u64,
    pub pow_diff: f64,
    pub ticket_price: u64,
    pub stake_count: u64,
    pub missed_votes: u64,
}
