use anyhow::anyhow;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::ENGINE;
use crate::error::ChartError;
use crate::models::ChartData;

use super::core::ChartEngine;

/// One collector step of the update cycle: fetch outside any lock, append under the
/// exclusive data lock.
#[async_trait]
pub trait ChartUpdater: Send + Sync {
    type Records: Send;

    /// Name used in logs and errors.
    fn tag(&self) -> &str;

    /// Fetch new records. May do network I/O and should stop promptly once `cancel` fires.
    async fn fetch(
        &self,
        engine: &ChartEngine,
        cancel: CancellationToken,
    ) -> anyhow::Result<Self::Records>;

    fn append(&self, data: &mut ChartData, records: Self::Records) -> anyhow::Result<()>;
}

/// Object-safe form of [`ChartUpdater`] stored by the engine.
#[async_trait]
pub trait UpdateStep: Send + Sync {
    fn tag(&self) -> &str;

    async fn run(&self, engine: &ChartEngine, cancel: &CancellationToken) -> Result<(), ChartError>;
}

#[async_trait]
impl<U: ChartUpdater> UpdateStep for U {
    fn tag(&self) -> &str {
        ChartUpdater::tag(self)
    }

    async fn run(&self, engine: &ChartEngine, cancel: &CancellationToken) -> Result<(), ChartError> {
        let tag = ChartUpdater::tag(self).to_string();
        // Cancelled when the step ends, whatever the outcome.
        let step_token = cancel.child_token();
        let _guard = step_token.clone().drop_guard();

        let state_id = engine.state_id();
        let fetched = tokio::select! {
            biased;
            _ = step_token.cancelled() => return Err(ChartError::Cancelled { tag }),
            res = tokio::time::timeout(ENGINE.fetch_timeout, self.fetch(engine, step_token.clone())) => res,
        };
        let records = match fetched {
            Ok(Ok(records)) => records,
            Ok(Err(source)) => return Err(ChartError::Fetch { tag, source }),
            Err(_) => {
                return Err(ChartError::Fetch {
                    tag,
                    source: anyhow!("timed out after {:?}", ENGINE.fetch_timeout),
                });
            }
        };

        engine.update_data(|data| {
            if data.state_id() != state_id {
                return Err(ChartError::StateChanged { tag: tag.clone() });
            }
            self.append(data, records)
                .map_err(|source| ChartError::Append {
                    tag: tag.clone(),
                    source,
                })
        })
    }
}
