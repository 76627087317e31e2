mod cache;
mod charts;
mod core;
mod downsample;
mod encode;
mod lengthen;
mod scheduler;
mod updater;

pub use cache::{CacheKey, CachedChart, ChartCache};
pub use charts::{ChartMaker, ChartRegistry, ChartRequest, RegisteredChart};
pub use self::core::ChartEngine;
pub use downsample::{
    Downsample, Ticks, accumulate, avg_block_times, block_times, generate_day_bin,
    generate_hour_bin, generate_ticks, lengthen_set,
};
pub use encode::{CsvChart, csv_summary, encode};
pub use scheduler::{UpdateLoopSettings, spawn_update_loop};
pub use updater::{ChartUpdater, UpdateStep};

pub(crate) use downsample::reduce_keyed;
