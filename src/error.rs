use thiserror::Error;

/// Failures surfaced by the chart engine and the update cycle.
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("unknown chart: {0}")]
    UnknownChart(String),

    #[error("{chart}: unknown source {source_key:?}")]
    UnknownSource { chart: String, source_key: String },

    #[error("data length mismatch: shortest {shortest}, longest {longest}")]
    LengthMismatch { shortest: usize, longest: usize },

    #[error("{0}: derived data runs ahead of raw data")]
    DerivedAhead(String),

    #[error("{tag}: state changed while fetching")]
    StateChanged { tag: String },

    #[error("{tag}: fetch failed")]
    Fetch {
        tag: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{tag}: append failed")]
    Append {
        tag: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{tag}: fetch cancelled")]
    Cancelled { tag: String },

    #[error("cache version mismatch: file v{found} vs required v{expected}")]
    VersionMismatch { expected: String, found: String },

    #[error("encode called with no data sets")]
    EmptyEncode,

    #[error("json encoding failed")]
    Encode(#[from] serde_json::Error),
}

impl ChartError {
    /// Tag of the updater that produced this error, if any.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::StateChanged { tag }
            | Self::Fetch { tag, .. }
            | Self::Append { tag, .. }
            | Self::Cancelled { tag } => Some(tag),
            _ => None,
        }
    }
}
