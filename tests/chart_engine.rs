use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use metric_charts::data::{MemorySource, SourceUpdater};
use metric_charts::domain::{
    AxisType, BinLevel, MempoolRecord, PowRecord, chart_id, parse_axis, parse_bin,
};
use metric_charts::models::{ChartFloats, ChartUints, SeriesSet, validate_lengths};
use metric_charts::{ChartData, ChartEngine, ChartError};

fn mempool(time: u64, size: u64) -> MempoolRecord {
    MempoolRecord {
        time,
        size,
        tx_count: 1,
        total_fee: 0.1,
    }
}

fn json_of(payload: &[u8]) -> Value {
    serde_json::from_slice(payload).unwrap()
}

#[test]
fn repeated_request_returns_identical_bytes() {
    let engine = ChartEngine::new();
    engine.update_data(|data| {
        data.pow.raw.append_records(&[PowRecord {
            time: 600,
            source: "pool".into(),
            hashrate: Some(9),
            workers: Some(3),
        }])
    });

    let first = engine.chart(chart_id::POW, "", "workers", &[]).unwrap();
    let second = engine.chart(chart_id::POW, "", "workers", &[]).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn appended_point_shows_up_in_chart() {
    let engine = ChartEngine::new();
    engine.update_data(|data| data.mempool.raw.append_records(&[mempool(60, 1)]));
    let before = json_of(&engine.chart(chart_id::MEMPOOL_SIZE, "", "", &[]).unwrap());

    engine.update_data(|data| data.mempool.raw.append_records(&[mempool(120, 2)]));
    let after = json_of(&engine.chart(chart_id::MEMPOOL_SIZE, "", "", &[]).unwrap());

    assert_eq!(before["y"], json!([1]));
    assert_eq!(after["y"], json!([1, 2]));
}

#[test]
fn mismatched_lengths_heal_by_truncation() {
    let time = ChartUints::from(vec![0, 60, 120]);
    let value = ChartFloats::from(vec![1.0, 2.0]);
    let err = validate_lengths(&[&time, &value]).unwrap_err();
    assert!(matches!(err, ChartError::LengthMismatch { shortest: 2, longest: 3 }));

    let engine = ChartEngine::new();
    let len = engine.update_data(|data| {
        let set = &mut data.mempool.raw;
        set.time = time;
        set.size = ChartUints::from(vec![5, 6]);
        set.tx_count = ChartUints::from(vec![1, 1]);
        set.fees = value;
        set.normalize()
    });
    assert_eq!(len, 2);
    engine.read(|data| {
        let set = &data.mempool.raw;
        assert_eq!(validate_lengths(&set.lengthers()).unwrap(), 2);
    });
}

#[tokio::test]
async fn hour_bins_are_built_incrementally() {
    let engine = ChartEngine::new();
    let records: Vec<MempoolRecord> = [0, 1800, 3600, 5400, 7200]
        .into_iter()
        .zip([10, 20, 30, 50, 70])
        .map(|(t, size)| mempool(t, size))
        .collect();
    engine.add_updater(SourceUpdater::<MempoolRecord, _>::new(
        "mempool",
        MemorySource::new(records),
    ));

    let cancel = CancellationToken::new();
    assert_eq!(engine.update(&cancel).await.unwrap(), 2);
    let hour = json_of(&engine.chart(chart_id::MEMPOOL_SIZE, "hour", "", &[]).unwrap());
    assert_eq!(hour, json!({"x": [0, 3600], "y": [15, 40]}));

    assert_eq!(engine.update(&cancel).await.unwrap(), 0);
    engine.read(|data| assert_eq!(data.mempool.hour.time.len(), 2));
}

#[test]
fn snapshot_round_trip_and_version_skew() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("charts.bin");

    let engine = ChartEngine::new();
    engine.update_data(|data| {
        let records: Vec<_> = (0..10).map(|i| mempool(i * 900, i)).collect();
        data.mempool.raw.append_records(&records);
        data.lengthen()
    });
    engine.dump(&path).unwrap();

    let restored = ChartEngine::new();
    restored.load(&path).unwrap();
    assert_eq!(restored.read(|d| d.clone()), engine.read(|d| d.clone()));

    let stale = metric_charts::data::encode_snapshot(&engine.read(|d| d.clone()), "0.0.1").unwrap();
    metric_charts::data::write_atomically(&path, &stale).unwrap();
    let fresh = ChartEngine::new();
    let err = fresh.load(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ChartError>(),
        Some(ChartError::VersionMismatch { .. })
    ));
    assert_eq!(fresh.read(|d| d.clone()), ChartData::default());
}

#[test]
fn unknown_tokens_fall_back() {
    assert_eq!(parse_bin("bogus"), BinLevel::Default);
    assert_eq!(parse_axis("BOGUS"), AxisType::Time);
    assert_eq!(parse_axis("Height"), AxisType::Height);
}

#[test]
fn encoder_truncates_to_shortest() {
    let a = ChartUints::from(vec![1, 2, 3, 4, 5]);
    let b = ChartUints::from(vec![6, 7, 8]);
    let value = metric_charts::engine::encode(Some(&["x", "y"][..]), &[&a, &b]).unwrap();
    assert_eq!(value, json!({"x": [1, 2, 3], "y": [6, 7, 8]}));
}
