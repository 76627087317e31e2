use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::ENGINE;
use crate::error::ChartError;

use super::core::ChartEngine;

#[derive(Debug, Clone)]
pub struct UpdateLoopSettings {
    pub interval: Duration,
    /// Dump after every N successful cycles; 0 disables periodic dumps.
    pub dump_every_cycles: u32,
    /// Where to dump. `None` disables dumping entirely.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for UpdateLoopSettings {
    fn default() -> Self {
        Self {
            interval: ENGINE.update_interval,
            dump_every_cycles: ENGINE.dump_every_cycles,
            snapshot_path: None,
        }
    }
}

async fn dump_in_background(engine: &Arc<ChartEngine>, path: &Path) {
    let engine = engine.clone();
    let path = path.to_path_buf();
    match tokio::task::spawn_blocking(move || engine.dump(&path)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => log::error!("snapshot dump failed: {:#}", e),
        Err(e) => log::error!("snapshot dump task panicked: {}", e),
    }
}

/// Run update cycles on an interval until `cancel` fires, then dump once more.
///
/// Failed cycles are logged and retried on the next tick.
pub fn spawn_update_loop(
    engine: Arc<ChartEngine>,
    settings: UpdateLoopSettings,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles: u32 = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match engine.update(&cancel).await {
                Ok(added) => {
                    cycles = cycles.wrapping_add(1);
                    log::info!("update cycle {} done, {} derived points", cycles, added);
                }
                Err(ChartError::Cancelled { .. }) if cancel.is_cancelled() => break,
                Err(e) => {
                    log::warn!("update cycle failed: {:#}", anyhow::Error::from(e));
                    continue;
                }
            }

            if let Some(path) = &settings.snapshot_path
                && settings.dump_every_cycles > 0
                && cycles % settings.dump_every_cycles == 0
            {
                dump_in_background(&engine, path).await;
            }
        }

        if let Some(path) = &settings.snapshot_path {
            dump_in_background(&engine, path).await;
        }
        log::info!("update loop stopped after {} cycles", cycles);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loop_dumps_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("charts.bin");
        let engine = Arc::new(ChartEngine::new());
        let cancel = CancellationToken::new();

        let handle = spawn_update_loop(
            engine.clone(),
            UpdateLoopSettings {
                interval: Duration::from_millis(10),
                dump_every_cycles: 0,
                snapshot_path: Some(path.clone()),
            },
            cancel.clone(),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(path.exists());
        let restored = ChartEngine::new();
        restored.load(&path).unwrap();
    }
}
