use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};

use super::BinLevel;

/// A metric family: one raw series set plus whatever derived sets it owns.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, Display, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Family {
    Mempool,
    Propagation,
    Pow,
    Vsp,
    Exchange,
    Snapshot,
    /// Chain data: blocks, daily block aggregates and ticket windows.
    Blocks,
}

impl Family {
    /// Bins this family materialises.
    pub fn bins(&self) -> &'static [BinLevel] {
        match self {
            Self::Propagation => &[BinLevel::Default],
            Self::Blocks => &[BinLevel::Block, BinLevel::Day, BinLevel::Window],
            _ => &[BinLevel::Default, BinLevel::Hour, BinLevel::Day],
        }
    }

    /// Map a requested bin onto one the family actually stores.
    pub fn resolve_bin(&self, bin: BinLevel) -> BinLevel {
        match (self, bin) {
            (Self::Blocks, BinLevel::Day | BinLevel::Window) => bin,
            (Self::Blocks, _) => BinLevel::Block,
            (Self::Propagation, _) => BinLevel::Default,
            (_, BinLevel::Hour | BinLevel::Day) => bin,
            _ => BinLevel::Default,
        }
    }
}
