//! Time constants shared by the downsampling passes. All timestamps are Unix seconds.

pub const A_MINUTE: u64 = 60;
pub const AN_HOUR: u64 = 60 * A_MINUTE;
pub const A_DAY: u64 = 24 * AN_HOUR;

/// Keys used by the encoder when the caller supplies none.
pub const DEFAULT_ENCODE_KEYS: [&str; 3] = ["x", "y", "z"];
