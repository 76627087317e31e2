use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};

/// Temporal resolution of a series set.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize, Display, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum BinLevel {
    /// Raw collected points, one per observation.
    #[default]
    Default,
    Hour,
    Day,
    /// Ticket price windows.
    Window,
    Block,
    /// Family-specific aliases of the raw bin.
    Propagation,
    Mempool,
    Pow,
}

/// Legacy bin vocabulary: only `block` and `window` are recognised, everything else
/// (including `day`) falls back to the default bin.
pub fn parse_bin(s: &str) -> BinLevel {
    match s {
        "block" => BinLevel::Block,
        "window" => BinLevel::Window,
        _ => BinLevel::Default,
    }
}

/// Bin parser used for chart requests. Recognises the zoom and family tokens
/// before deferring to [`parse_bin`].
pub fn parse_request_bin(s: &str) -> BinLevel {
    match s {
        "hour" => BinLevel::Hour,
        "day" => BinLevel::Day,
        "mempool" => BinLevel::Mempool,
        "propagation" => BinLevel::Propagation,
        "pow" => BinLevel::Pow,
        other => parse_bin(other),
    }
}

/// Quantity plotted on a chart's value (or x) axis.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize, Display, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum AxisType {
    #[default]
    Time,
    Height,
    Hashrate,
    Workers,
    Immature,
    Live,
    Voted,
    Missed,
    PoolFees,
    ProportionLive,
    ProportionMissed,
    UserCount,
    UsersActive,
    // exchange price axes
    Open,
    High,
    Low,
    Close,
    // network snapshot axes
    Nodes,
    ReachableNodes,
}

/// Case-insensitive axis lookup; anything unrecognised is the time axis.
pub fn parse_axis(s: &str) -> AxisType {
    match s.to_ascii_lowercase().as_str() {
        "height" => AxisType::Height,
        "hashrate" => AxisType::Hashrate,
        "workers" => AxisType::Workers,
        "immature" => AxisType::Immature,
        "live" => AxisType::Live,
        "voted" => AxisType::Voted,
        "missed" => AxisType::Missed,
        "pool-fees" => AxisType::PoolFees,
        "proportion-live" => AxisType::ProportionLive,
        "proportion-missed" => AxisType::ProportionMissed,
        "user-count" => AxisType::UserCount,
        "users-active" => AxisType::UsersActive,
        "open" => AxisType::Open,
        "high" => AxisType::High,
        "low" => AxisType::Low,
        "close" => AxisType::Close,
        "nodes" => AxisType::Nodes,
        "reachable-nodes" => AxisType::ReachableNodes,
        _ => AxisType::Time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_bin_falls_back_to_default() {
        assert_eq!(parse_bin("block"), BinLevel::Block);
        assert_eq!(parse_bin("window"), BinLevel::Window);
        assert_eq!(parse_bin("day"), BinLevel::Default);
        assert_eq!(parse_bin("bogus"), BinLevel::Default);
    }

    #[test]
    fn test_parse_request_bin_knows_zoom_levels() {
        assert_eq!(parse_request_bin("hour"), BinLevel::Hour);
        assert_eq!(parse_request_bin("day"), BinLevel::Day);
        assert_eq!(parse_request_bin("block"), BinLevel::Block);
        assert_eq!(parse_request_bin("garbage"), BinLevel::Default);
    }

    #[test]
    fn test_parse_axis_is_case_insensitive() {
        assert_eq!(parse_axis("HashRate"), AxisType::Hashrate);
        assert_eq!(parse_axis("Pool-Fees"), AxisType::PoolFees);
        assert_eq!(parse_axis("HEIGHT"), AxisType::Height);
        assert_eq!(parse_axis("sideways"), AxisType::Time);
    }

    #[test]
    fn test_axis_display_parses_back() {
        for axis in AxisType::iter() {
            assert_eq!(parse_axis(axis.as_ref()), axis, "{}", axis);
        }
    }
}
