#![allow(clippy::const_is_empty)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::type_complexity)]

// Core modules
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod models;
pub mod utils;

// Re-export commonly used types outside of crate (for the binaries)
pub use config::PERSISTENCE;
pub use engine::{ChartEngine, ChartUpdater, UpdateLoopSettings, spawn_update_loop};
pub use error::ChartError;
pub use models::ChartData;

// CLI argument parsing
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the snapshot, the family cache files and the `incoming/` inbox
    #[arg(long, default_value = PERSISTENCE.snapshot.directory)]
    pub data_dir: PathBuf,

    /// Print the encoded JSON of one chart
    #[arg(long)]
    pub chart: Option<String>,

    /// Bin for --chart (hour, day, block, window, ...)
    #[arg(long, default_value = "")]
    pub bin: String,

    /// Axis for --chart (time, height, hashrate, ...)
    #[arg(long, default_value = "")]
    pub axis: String,

    /// Source key for --chart; repeat for several
    #[arg(long = "source")]
    pub sources: Vec<String>,

    /// Print length and tip of every series set
    #[arg(long, default_value_t = false)]
    pub summary: bool,

    /// Write one cache file per family and bin under <data-dir>/families
    #[arg(long, default_value_t = false)]
    pub export_families: bool,

    /// Keep running, pulling records from <data-dir>/incoming until Ctrl-C
    #[arg(long, default_value_t = false)]
    pub watch: bool,

    /// Seconds between update cycles in --watch mode
    #[arg(long)]
    pub update_secs: Option<u64>,
}

impl Cli {
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(config::snapshot_filename())
    }

    pub fn families_dir(&self) -> PathBuf {
        self.data_dir.join("families")
    }

    pub fn inbox_dir(&self) -> PathBuf {
        self.data_dir.join("incoming")
    }
}
