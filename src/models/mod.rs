mod blocks;
mod chart_data;
mod exchange;
mod mempool;
mod network;
mod pow;
mod propagation;
mod sequence;
pub(crate) mod series_set;
mod vsp;

pub use {
    blocks::{BlockSet, WindowSet},
    chart_data::{ChartData, SetSummary},
    exchange::ExchangeTickSet,
    mempool::MempoolSet,
    network::{KeyedCountSet, NodeCountSet},
    pow::PowSet,
    propagation::PropagationSet,
    sequence::{
        ChartFloats, ChartNullFloats, ChartNullUints, ChartStrings, ChartUints, Lengther,
        NullData, Padded,
    },
    series_set::{BinFamily, SeriesSet, validate_lengths},
    vsp::{VspSeries, VspSet},
};
