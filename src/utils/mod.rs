mod locks;
mod perf;
pub mod time_utils;

pub(crate) use locks::{lock, read_lock, write_lock};
pub use time_utils::{
    TimeUtils, epoch_sec_to_datetime, epoch_sec_to_utc_string, format_duration,
    now_timestamp_ms,
};
