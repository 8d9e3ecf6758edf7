use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::runner::PipelineRunner;

/// Periodic trigger loop. Holds no lock of its own: a tick that lands
/// while a run is in flight is skipped, never queued.
pub fn spawn(
    runner: Arc<PipelineRunner>,
    every: Duration,
    warmup: Option<Duration>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(delay) = warmup {
            tokio::time::sleep(delay).await;
            fire(&runner, "startup");
        }

        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval yields immediately the first time; the warm-up already
        // covers startup
        ticker.tick().await;

        loop {
            ticker.tick().await;
            fire(&runner, "scheduler");
        }
    })
}

fn fire(runner: &Arc<PipelineRunner>, reason: &str) {
    if runner.trigger(reason).is_err() {
        info!(reason, "pipeline already running, skipping tick");
    }
}
