// Domain types and value objects
mod bin_level;
mod exchange_key;
mod family;
mod records;

pub mod chart_id;

// Re-export commonly used types to the world
pub use bin_level::{AxisType, BinLevel, parse_axis, parse_bin, parse_request_bin};
pub use exchange_key::ExchangeKey;
pub use family::Family;
pub use records::{
    BlockRecord, ExchangeTick, MempoolRecord, NetworkSnapshotRecord, PowRecord,
    PropagationRecord, VspRecord, WindowRecord,
};
