use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

use metric_charts::config::constants::{A_DAY, A_MINUTE, AN_HOUR};
use metric_charts::config::{PERSISTENCE, snapshot_filename};
use metric_charts::domain::{
    BlockRecord, ExchangeKey, ExchangeTick, MempoolRecord, NetworkSnapshotRecord, PowRecord,
    PropagationRecord, VspRecord, WindowRecord,
};
use metric_charts::{ChartData, ChartEngine};

// A week of data keeps the demo snapshot small while filling every day bin.
const DEMO_DAYS: u64 = 7;
const DEMO_START: u64 = 1_700_006_400; // 2023-11-15 00:00:00 UTC
const BLOCK_SECS: u64 = 5 * A_MINUTE;
const POOLS: [&str; 3] = ["f2pool", "poolin", "viabtc"];
const VSPS: [&str; 2] = ["vsp.alpha", "vsp.beta"];

/// Deterministic wobble in `[0, 1)` so demo charts are not flat lines.
fn wobble(i: u64, salt: u64) -> f64 {
    let x = (i.wrapping_mul(2_654_435_761) ^ salt.wrapping_mul(40_503)) % 1_000;
    x as f64 / 1_000.0
}

fn fill(data: &mut ChartData) {
    let end = DEMO_START + DEMO_DAYS * A_DAY;
    let key = ExchangeKey::new("binance", "DCR/BTC", AN_HOUR);

    let mut blocks = Vec::new();
    let mut propagation = Vec::new();
    let mut chainwork = 0;
    for (i, time) in (DEMO_START..end).step_by(BLOCK_SECS as usize).enumerate() {
        let i = i as u64;
        let height = 800_000 + i;
        chainwork += 1_000 + (wobble(i, 1) * 100.0) as u64;
        blocks.push(BlockRecord {
            height,
            time,
            pool_size: 40_000 + (wobble(i, 2) * 500.0) as u64,
            pool_value: 8_000_000 + i * 3,
            block_size: 4_000 + (wobble(i, 3) * 12_000.0) as u64,
            tx_count: 10 + (wobble(i, 4) * 40.0) as u64,
            new_atoms: 1_100_000_000,
            chainwork,
            fees: (wobble(i, 5) * 20_000.0) as u64,
        });
        propagation.push(PropagationRecord {
            height,
            time: time + 2,
            block_delay: 1.0 + wobble(i, 6) * 3.0,
            vote_receive_deviation: wobble(i, 7),
            source_deviations: BTreeMap::from([
                ("dcrdata.eu".to_string(), wobble(i, 8) * 2.0),
                ("dcrdata.us".to_string(), wobble(i, 9) * 2.0),
            ]),
        });
    }

    let mut mempool = Vec::new();
    let mut pow = Vec::new();
    let mut vsp = Vec::new();
    let mut ticks = Vec::new();
    let mut snapshots = Vec::new();
    for (i, time) in (DEMO_START..end).step_by((10 * A_MINUTE) as usize).enumerate() {
        let i = i as u64;
        mempool.push(MempoolRecord {
            time,
            size: 20_000 + (wobble(i, 10) * 80_000.0) as u64,
            tx_count: 5 + (wobble(i, 11) * 60.0) as u64,
            total_fee: wobble(i, 12) * 0.05,
        });
        for (p, pool) in POOLS.iter().enumerate() {
            let p = p as u64;
            pow.push(PowRecord {
                time,
                source: pool.to_string(),
                // Pools miss the occasional poll.
                hashrate: (wobble(i, 20 + p) > 0.05).then(|| 50 + (wobble(i, 30 + p) * 20.0) as u64),
                workers: Some(100 + (wobble(i, 40 + p) * 50.0) as u64),
            });
        }
        if i % 6 == 0 {
            for (v, name) in VSPS.iter().enumerate() {
                let v = v as u64;
                vsp.push(VspRecord {
                    vsp: name.to_string(),
                    time,
                    immature: Some(10 + (wobble(i, 50 + v) * 10.0) as u64),
                    live: Some(800 + (wobble(i, 60 + v) * 100.0) as u64),
                    voted: Some(20_000 + i),
                    missed: Some(12),
                    pool_fees: Some(0.5 + v as f64),
                    proportion_live: Some(0.05 * wobble(i, 70 + v)),
                    proportion_missed: Some(0.001),
                    user_count: Some(300 + v * 50),
                    users_active: Some(120 + v * 20),
                });
            }
            let close = 0.0009 + wobble(i, 80) * 0.0002;
            ticks.push(ExchangeTick {
                key: key.clone(),
                time,
                open: close * 0.99,
                high: close * 1.02,
                low: close * 0.97,
                close,
            });
            snapshots.push(NetworkSnapshotRecord {
                time,
                nodes: 180 + (wobble(i, 90) * 40.0) as u64,
                reachable_nodes: 120 + (wobble(i, 91) * 30.0) as u64,
                locations: BTreeMap::from([
                    ("DE".to_string(), 40),
                    ("US".to_string(), 55 + (wobble(i, 92) * 10.0) as u64),
                ]),
                versions: BTreeMap::from([("dcrd/2.0.0".to_string(), 150)]),
            });
        }
    }

    let windows: Vec<WindowRecord> = (DEMO_START..end)
        .step_by((144 * BLOCK_SECS) as usize)
        .enumerate()
        .map(|(i, time)| WindowRecord {
            time,
            pow_diff: 5.0e10 * (1.0 + wobble(i as u64, 100) * 0.1),
            ticket_price: 20_000_000_000 + (wobble(i as u64, 101) * 1.0e9) as u64,
            stake_count: 5 * 144,
            missed_votes: (wobble(i as u64, 102) * 5.0) as u64,
        })
        .collect();

    data.blocks.append_records(&blocks);
    data.windows.append_records(&windows);
    data.propagation.append_records(&propagation);
    data.mempool.raw.append_records(&mempool);
    data.pow.raw.append_records(&pow);
    data.vsp.raw.append_records(&vsp);
    data.append_exchange_ticks(&ticks);
    data.append_snapshots(&snapshots);
}

fn main() -> Result<()> {
    // 1. Setup Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Build and downsample
    let engine = ChartEngine::new();
    let derived = engine.update_data(|data| {
        fill(data);
        data.lengthen()
    });
    log::info!("Demo data built: {} derived points", derived);

    // 3. Write with the standard name, prefixed 'demo_'
    let path = PathBuf::from(PERSISTENCE.snapshot.directory).join(format!("demo_{}", snapshot_filename()));
    let bytes = engine.dump(&path)?;
    log::info!(
        "✅ Demo snapshot written: {} ({:.1} KB)",
        path.display(),
        bytes as f64 / 1024.0
    );
    Ok(())
}
