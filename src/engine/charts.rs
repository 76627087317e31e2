//! Chart builders and the per-engine registry that maps chart ids to them.
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::{AxisType, BinLevel, ExchangeKey, Family, chart_id};
use crate::engine::downsample::{accumulate, avg_block_times, block_times, generate_day_bin};
use crate::engine::encode::{csv_summary, encode};
use crate::error::ChartError;
use crate::models::{BlockSet, ChartData, ChartUints, Lengther, NullData};

/// A resolved chart request as seen by a builder.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub chart_id: String,
    /// Already resolved to a bin the chart's family materialises.
    pub bin: BinLevel,
    pub axis: AxisType,
    pub sources: Vec<String>,
}

/// Builds a chart's JSON value from the series data. Runs under the data read lock.
pub type ChartMaker = Arc<dyn Fn(&ChartData, &ChartRequest) -> Result<Value, ChartError> + Send + Sync>;

#[derive(Clone)]
pub struct RegisteredChart {
    pub family: Family,
    /// Charts drawn from a fixed set ignore the requested bin.
    pub fixed_bin: Option<BinLevel>,
    pub maker: ChartMaker,
}

impl RegisteredChart {
    pub fn resolve_bin(&self, requested: BinLevel) -> BinLevel {
        self.fixed_bin
            .unwrap_or_else(|| self.family.resolve_bin(requested))
    }
}

/// Chart id to builder table, owned by one engine instance.
#[derive(Clone)]
pub struct ChartRegistry {
    charts: HashMap<String, RegisteredChart>,
}

impl ChartRegistry {
    pub fn empty() -> Self {
        Self {
            charts: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: &str, family: Family, fixed_bin: Option<BinLevel>, maker: ChartMaker) {
        self.charts.insert(
            id.to_string(),
            RegisteredChart {
                family,
                fixed_bin,
                maker,
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredChart> {
        self.charts.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.charts.keys().map(String::as_str)
    }
}

impl Default for ChartRegistry {
    /// Every built-in chart.
    fn default() -> Self {
        use chart_id::*;

        let mut reg = Self::empty();
        let mut add = |id: &str, family: Family, fixed_bin: Option<BinLevel>, maker: fn(&ChartData, &ChartRequest) -> Result<Value, ChartError>| {
            reg.register(id, family, fixed_bin, Arc::new(maker));
        };

        for id in [MEMPOOL_SIZE, MEMPOOL_TX_COUNT, MEMPOOL_FEES] {
            add(id, Family::Mempool, None, mempool_chart);
        }
        for id in [BLOCK_PROPAGATION, BLOCK_TIMESTAMP, VOTES_RECEIVE_TIME] {
            add(id, Family::Propagation, None, propagation_chart);
        }
        add(POW, Family::Pow, None, pow_chart);
        add(VSP, Family::Vsp, None, vsp_chart);
        add(EXCHANGE, Family::Exchange, None, exchange_chart);
        add(NODES, Family::Snapshot, None, nodes_chart);
        for id in [NODE_LOCATIONS, NODE_VERSIONS] {
            add(id, Family::Snapshot, None, node_breakdown_chart);
        }
        for id in [BLOCK_SIZE, TX_COUNT, FEES, CUMULATIVE_FEES, CHAINWORK] {
            add(id, Family::Blocks, None, block_chart);
        }
        add(DURATION_BTW_BLOCKS, Family::Blocks, None, duration_btw_blocks_chart);
        for id in [TICKET_PRICE, POW_DIFFICULTY, MISSED_VOTES] {
            add(id, Family::Blocks, Some(BinLevel::Window), window_chart);
        }
        reg
    }
}

/// Requested keys, or every key when none were requested.
fn select_keys<'a, V>(
    chart: &str,
    available: &'a BTreeMap<String, V>,
    requested: &'a [String],
) -> Result<Vec<(&'a str, &'a V)>, ChartError> {
    if requested.is_empty() {
        return Ok(available.iter().map(|(k, v)| (k.as_str(), v)).collect());
    }
    requested
        .iter()
        .map(|key| {
            available
                .get(key)
                .map(|v| (key.as_str(), v))
                .ok_or_else(|| ChartError::UnknownSource {
                    chart: chart.to_string(),
                    source_key: key.clone(),
                })
        })
        .collect()
}

fn mempool_chart(data: &ChartData, req: &ChartRequest) -> Result<Value, ChartError> {
    let set = data.mempool.get(req.bin);
    let y: &dyn Lengther = match req.chart_id.as_str() {
        chart_id::MEMPOOL_TX_COUNT => &set.tx_count,
        chart_id::MEMPOOL_FEES => &set.fees,
        _ => &set.size,
    };
    let x: &dyn Lengther = match req.axis {
        AxisType::Height => &set.heights,
        _ => &set.time,
    };
    encode(None, &[x, y])
}

fn propagation_chart(data: &ChartData, req: &ChartRequest) -> Result<Value, ChartError> {
    let set = &data.propagation;
    match req.chart_id.as_str() {
        chart_id::BLOCK_TIMESTAMP => encode(None, &[&set.heights, &set.block_delays]),
        chart_id::VOTES_RECEIVE_TIME => encode(None, &[&set.heights, &set.vote_receive_deviations]),
        _ => {
            let selected = select_keys(&req.chart_id, &set.block_propagation, &req.sources)?;
            let mut sets: Vec<&dyn Lengther> = vec![&set.heights];
            sets.extend(selected.into_iter().map(|(_, s)| s as &dyn Lengther));
            encode(None, &sets)
        }
    }
}

fn pow_chart(data: &ChartData, req: &ChartRequest) -> Result<Value, ChartError> {
    let set = data.pow.get(req.bin);
    let selected = select_keys(&req.chart_id, set.by_axis(req.axis), &req.sources)?;
    let names: Vec<&str> = selected.iter().map(|(name, _)| *name).collect();
    let series: Vec<&dyn NullData> = selected.iter().map(|(_, s)| *s as &dyn NullData).collect();
    Ok(serde_json::to_value(csv_summary(&set.time, &names, &series))?)
}

fn vsp_chart(data: &ChartData, req: &ChartRequest) -> Result<Value, ChartError> {
    let set = data.vsp.get(req.bin);
    let selected = select_keys(&req.chart_id, &set.vsps, &req.sources)?;
    let mut names = Vec::with_capacity(selected.len());
    let mut series = Vec::with_capacity(selected.len());
    for (name, vsp) in selected {
        // Non-VSP axes fall back to immature tickets.
        if let Some(s) = vsp.axis(req.axis).or_else(|| vsp.axis(AxisType::Immature)) {
            names.push(name);
            series.push(s);
        }
    }
    Ok(serde_json::to_value(csv_summary(&set.time, &names, &series))?)
}

fn exchange_chart(data: &ChartData, req: &ChartRequest) -> Result<Value, ChartError> {
    let raw_key = req.sources.first().map(String::as_str).unwrap_or_default();
    let unknown = || ChartError::UnknownSource {
        chart: req.chart_id.clone(),
        source_key: raw_key.to_string(),
    };
    let key = ExchangeKey::parse(raw_key).ok_or_else(unknown)?;
    let sets = data.exchange.get(&key).ok_or_else(unknown)?;
    let set = sets.get(req.bin);
    encode(None, &[&set.time, set.by_axis(req.axis)])
}

fn nodes_chart(data: &ChartData, req: &ChartRequest) -> Result<Value, ChartError> {
    let set = data.nodes.get(req.bin);
    match req.axis {
        AxisType::Nodes => encode(None, &[&set.time, &set.nodes]),
        AxisType::ReachableNodes => encode(None, &[&set.time, &set.reachable_nodes]),
        _ => encode(None, &[&set.time, &set.nodes, &set.reachable_nodes]),
    }
}

fn node_breakdown_chart(data: &ChartData, req: &ChartRequest) -> Result<Value, ChartError> {
    let set = match req.chart_id.as_str() {
        chart_id::NODE_VERSIONS => data.versions.get(req.bin),
        _ => data.locations.get(req.bin),
    };
    let selected = select_keys(&req.chart_id, &set.counts, &req.sources)?;
    let mut sets: Vec<&dyn Lengther> = vec![&set.time];
    sets.extend(selected.into_iter().map(|(_, s)| s as &dyn Lengther));
    encode(None, &sets)
}

fn block_set(data: &ChartData, bin: BinLevel) -> &BlockSet {
    match bin {
        BinLevel::Day => &data.days,
        _ => &data.blocks,
    }
}

fn block_chart(data: &ChartData, req: &ChartRequest) -> Result<Value, ChartError> {
    let set = block_set(data, req.bin);
    let x: &dyn Lengther = match req.axis {
        AxisType::Height => &set.heights,
        _ => &set.time,
    };
    let cumulative;
    let y: &dyn Lengther = match req.chart_id.as_str() {
        chart_id::TX_COUNT => &set.tx_count,
        chart_id::FEES => &set.fees,
        chart_id::CHAINWORK => &set.chainwork,
        chart_id::CUMULATIVE_FEES => {
            cumulative = accumulate(&set.fees);
            &cumulative
        }
        _ => &set.block_size,
    };
    encode(None, &[x, y])
}

fn duration_btw_blocks_chart(data: &ChartData, req: &ChartRequest) -> Result<Value, ChartError> {
    let blocks = &data.blocks;
    if req.bin == BinLevel::Day {
        let ticks = generate_day_bin(&blocks.time, Some(&blocks.heights[..]));
        let avg = avg_block_times(&ticks, &blocks.time);
        let x: &dyn Lengther = match req.axis {
            AxisType::Height => &ticks.heights,
            _ => &ticks.boundaries,
        };
        return encode(None, &[x, &avg]);
    }
    // The first block has no predecessor, so x starts at the second one.
    let x: ChartUints = match req.axis {
        AxisType::Height => blocks.heights.iter().skip(1).copied().collect(),
        _ => blocks.time.iter().skip(1).copied().collect(),
    };
    encode(None, &[&x, &block_times(&blocks.time)])
}

fn window_chart(data: &ChartData, req: &ChartRequest) -> Result<Value, ChartError> {
    let set = &data.windows;
    let y: &dyn Lengther = match req.chart_id.as_str() {
        chart_id::POW_DIFFICULTY => &set.pow_diff,
        chart_id::MISSED_VOTES => &set.missed_votes,
        _ => &set.ticket_price,
    };
    encode(None, &[&set.time, y])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlockRecord, PowRecord};
    use serde_json::json;

    fn request(chart: &str, bin: BinLevel, axis: AxisType, sources: &[&str]) -> ChartRequest {
        ChartRequest {
            chart_id: chart.to_string(),
            bin,
            axis,
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn build(data: &ChartData, req: &ChartRequest) -> Result<Value, ChartError> {
        let registry = ChartRegistry::default();
        let chart = registry.get(&req.chart_id).expect("registered");
        (chart.maker)(data, req)
    }

    #[test]
    fn test_every_chart_id_is_registered() {
        let registry = ChartRegistry::default();
        assert_eq!(registry.ids().count(), 21);
        assert_eq!(
            registry.get(chart_id::TICKET_PRICE).unwrap().resolve_bin(BinLevel::Day),
            BinLevel::Window
        );
    }

    #[test]
    fn test_mempool_height_axis() {
        let mut data = ChartData::default();
        data.mempool.raw.time.extend([10, 20]);
        data.mempool.raw.heights.extend([1]);
        data.mempool.raw.size.extend([100, 200]);
        let req = request(chart_id::MEMPOOL_SIZE, BinLevel::Default, AxisType::Height, &[]);
        assert_eq!(build(&data, &req).unwrap(), json!({"x": [1], "y": [100]}));
    }

    #[test]
    fn test_pow_chart_is_csv() {
        let mut data = ChartData::default();
        data.pow.raw.append_records(&[PowRecord {
            time: 0,
            source: "alpha".into(),
            hashrate: Some(42),
            workers: None,
        }]);
        let req = request(chart_id::POW, BinLevel::Default, AxisType::Hashrate, &[]);
        let value = build(&data, &req).unwrap();
        assert_eq!(value["csv"], json!("Date,alpha\n1970-01-01 00:00:00 +0000 UTC,42\n"));
        assert_eq!(value["min_date"], json!("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn test_unknown_source_is_an_error() {
        let data = ChartData::default();
        let req = request(chart_id::POW, BinLevel::Default, AxisType::Hashrate, &["nope"]);
        assert!(matches!(build(&data, &req), Err(ChartError::UnknownSource { .. })));
        let req = request(chart_id::EXCHANGE, BinLevel::Default, AxisType::Close, &[]);
        assert!(matches!(build(&data, &req), Err(ChartError::UnknownSource { .. })));
    }

    #[test]
    fn test_block_charts() {
        let mut data = ChartData::default();
        data.blocks.append_records(&[
            BlockRecord { height: 1, time: 100, fees: 3, ..Default::default() },
            BlockRecord { height: 2, time: 400, fees: 4, ..Default::default() },
            BlockRecord { height: 3, time: 350, fees: 5, ..Default::default() },
        ]);
        let req = request(chart_id::CUMULATIVE_FEES, BinLevel::Block, AxisType::Height, &[]);
        assert_eq!(build(&data, &req).unwrap(), json!({"x": [1, 2, 3], "y": [3, 7, 12]}));

        let req = request(chart_id::DURATION_BTW_BLOCKS, BinLevel::Block, AxisType::Time, &[]);
        assert_eq!(build(&data, &req).unwrap(), json!({"x": [400, 350], "y": [300, 0]}));
    }
}
