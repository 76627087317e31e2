use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::{panic, time::Duration};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tokio_util::sync::CancellationToken;

use metric_charts::data::{FamilyRecord, FamilyStore, JsonFileSource, SourceUpdater};
use metric_charts::domain::{
    BlockRecord, ExchangeTick, Family, MempoolRecord, NetworkSnapshotRecord, PowRecord,
    PropagationRecord, VspRecord, WindowRecord,
};
use metric_charts::utils::epoch_sec_to_utc_string;
use metric_charts::{ChartEngine, Cli, UpdateLoopSettings, spawn_update_loop};

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Bin")]
    bin: String,
    #[tabled(rename = "Set")]
    set: &'static str,
    #[tabled(rename = "Points")]
    len: usize,
    #[tabled(rename = "Tip")]
    tip: String,
}

fn print_summary(engine: &ChartEngine) {
    let rows: Vec<SummaryRow> = engine
        .summary()
        .into_iter()
        .map(|s| SummaryRow {
            family: s.family.to_string(),
            bin: s.bin.to_string(),
            set: s.label,
            len: s.len,
            // Propagation is keyed by height rather than time.
            tip: match (s.family, s.fingerprint) {
                (_, 0) => "-".to_string(),
                (Family::Propagation, height) => format!("height {}", height),
                (_, time) => epoch_sec_to_utc_string(time),
            },
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::modern()));
}

fn inbox_step<R: FamilyRecord + DeserializeOwned>(engine: &ChartEngine, inbox: &Path, name: &str) {
    let source = JsonFileSource::<R>::new(inbox.join(format!("{}.json", name)));
    engine.add_updater(SourceUpdater::<R, _>::new(name, source));
}

/// One JSON-file collector per record type, read from `<inbox>/<name>.json`.
fn register_inbox(engine: &ChartEngine, inbox: &Path) {
    inbox_step::<BlockRecord>(engine, inbox, "blocks");
    inbox_step::<WindowRecord>(engine, inbox, "windows");
    inbox_step::<PropagationRecord>(engine, inbox, "propagation");
    inbox_step::<MempoolRecord>(engine, inbox, "mempool");
    inbox_step::<PowRecord>(engine, inbox, "pow");
    inbox_step::<VspRecord>(engine, inbox, "vsp");
    inbox_step::<ExchangeTick>(engine, inbox, "exchange");
    inbox_step::<NetworkSnapshotRecord>(engine, inbox, "snapshot");
}

#[tokio::main]
async fn main() -> Result<()> {
    panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Debug)
    } else {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    };

    let mut builder = env_logger::Builder::new();

    builder
        .filter(None, global_level)
        .filter(Some("metric_charts"), my_code_level)
        .filter(Some("metric_charts::engine::cache"), log::LevelFilter::Info)
        .init();

    let args = Cli::parse();
    let snapshot_path = args.snapshot_path();
    let engine = Arc::new(ChartEngine::new());
    if args.watch {
        register_inbox(&engine, &args.inbox_dir());
    }

    let cancel = CancellationToken::new();
    match engine.load_and_update(&snapshot_path, &cancel).await {
        Ok(added) => log::info!("ready, {} derived points added", added),
        Err(e) => log::warn!("initial update failed: {:#}", anyhow::Error::from(e)),
    }

    if args.summary {
        print_summary(&engine);
    }

    if let Some(chart) = &args.chart {
        let payload = engine
            .chart(chart, &args.bin, &args.axis, &args.sources)
            .with_context(|| format!("Failed to build chart {}", chart))?;
        println!("{}", String::from_utf8_lossy(&payload));
    }

    if args.export_families {
        let store = FamilyStore::new(args.families_dir());
        let written = engine.save_families(&store)?;
        log::info!("{} family files written to {}", written, store.dir().display());
    }

    if args.watch {
        let mut settings = UpdateLoopSettings {
            snapshot_path: Some(snapshot_path),
            ..Default::default()
        };
        if let Some(secs) = args.update_secs {
            settings.interval = Duration::from_secs(secs.max(1));
        }
        let handle = spawn_update_loop(engine.clone(), settings, cancel.clone());

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        log::info!("shutting down");
        cancel.cancel();
        handle.await.context("Update loop panicked")?;
    }

    Ok(())
}
