use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use gw_core::PipelineStage;

/// Outcome of one stage invocation. A timed-out stage is reported
/// distinctly from an ordinary failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed { items: u64 },
    Failed { error: String },
    TimedOut { after_secs: u64 },
}

impl StageOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, StageOutcome::Completed { .. })
    }
}

/// Record of the most recent run, kept until the next run replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub ok: bool,
    pub reason: String,
    pub failed_step: Option<String>,
    pub ingest: Option<StageOutcome>,
    pub summarize: Option<StageOutcome>,
    pub finished_at: DateTime<Utc>,
}

/// Snapshot served by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_result: Option<RunReport>,
}

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("pipeline already running")]
    AlreadyRunning,
}

#[derive(Debug, Default)]
struct RunState {
    running: bool,
    started_at: Option<DateTime<Utc>>,
    last_run_at: Option<DateTime<Utc>>,
    last_result: Option<RunReport>,
}

/// Sequences ingest then summarize under a single-run lock. Both the
/// scheduler and the admin trigger funnel through `trigger`; nothing
/// else mutates the run state.
pub struct PipelineRunner {
    ingest: Arc<dyn PipelineStage>,
    summarize: Arc<dyn PipelineStage>,
    stage_timeout: Duration,
    state: Mutex<RunState>,
}

/// Releases the run lock when dropped, covering success, stage failure,
/// timeout, and panics inside the run task alike.
struct RunGuard {
    runner: Arc<PipelineRunner>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut state = self.runner.lock_state();
        state.running = false;
        state.started_at = None;
        state.last_run_at = Some(Utc::now());
    }
}

impl PipelineRunner {
    pub fn new(
        ingest: Arc<dyn PipelineStage>,
        summarize: Arc<dyn PipelineStage>,
        stage_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            ingest,
            summarize,
            stage_timeout,
            state: Mutex::new(RunState::default()),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_acquire(self: &Arc<Self>) -> Result<RunGuard, TriggerError> {
        let mut state = self.lock_state();
        if state.running {
            return Err(TriggerError::AlreadyRunning);
        }
        state.running = true;
        state.started_at = Some(Utc::now());
        Ok(RunGuard {
            runner: Arc::clone(self),
        })
    }

    /// Start a run unless one is already in flight. Returns immediately;
    /// the run proceeds on a spawned task.
    pub fn trigger(self: &Arc<Self>, reason: &str) -> Result<(), TriggerError> {
        let guard = self.try_acquire()?;
        info!(reason, "pipeline run accepted");
        let runner = Arc::clone(self);
        let reason = reason.to_string();
        tokio::spawn(async move {
            runner.execute(reason, guard).await;
        });
        Ok(())
    }

    /// Run the pipeline to completion on the caller's task. One-shot CLI
    /// path; the serving path goes through `trigger`.
    pub async fn run_now(self: &Arc<Self>, reason: &str) -> Result<RunReport, TriggerError> {
        let guard = self.try_acquire()?;
        info!(reason, "pipeline run accepted");
        Ok(self.execute(reason.to_string(), guard).await)
    }

    async fn execute(&self, reason: String, guard: RunGuard) -> RunReport {
        let ingest = self.run_stage(&self.ingest).await;

        let report = if !ingest.is_ok() {
            error!(stage = "ingest", "pipeline run failed");
            RunReport {
                ok: false,
                reason,
                failed_step: Some("ingest".to_string()),
                ingest: Some(ingest),
                summarize: None,
                finished_at: Utc::now(),
            }
        } else {
            let summarize = self.run_stage(&self.summarize).await;
            if !summarize.is_ok() {
                error!(stage = "summarize", "pipeline run failed");
                RunReport {
                    ok: false,
                    reason,
                    failed_step: Some("summarize".to_string()),
                    ingest: Some(ingest),
                    summarize: Some(summarize),
                    finished_at: Utc::now(),
                }
            } else {
                info!("pipeline run complete");
                RunReport {
                    ok: true,
                    reason,
                    failed_step: None,
                    ingest: Some(ingest),
                    summarize: Some(summarize),
                    finished_at: Utc::now(),
                }
            }
        };

        self.lock_state().last_result = Some(report.clone());
        drop(guard);
        report
    }

    async fn run_stage(&self, stage: &Arc<dyn PipelineStage>) -> StageOutcome {
        let name = stage.name();
        info!(stage = name, "stage starting");

        let mut task = {
            let stage = Arc::clone(stage);
            tokio::spawn(async move { stage.run().await })
        };

        match tokio::time::timeout(self.stage_timeout, &mut task).await {
            Err(_) => {
                // the unit of work is killed outright, not asked nicely
                task.abort();
                warn!(
                    stage = name,
                    after_secs = self.stage_timeout.as_secs(),
                    "stage timed out"
                );
                StageOutcome::TimedOut {
                    after_secs: self.stage_timeout.as_secs(),
                }
            }
            Ok(Err(join)) => {
                warn!(stage = name, error = %join, "stage crashed");
                StageOutcome::Failed {
                    error: format!("stage crashed: {join}"),
                }
            }
            Ok(Ok(Err(e))) => {
                warn!(stage = name, error = %e, "stage failed");
                StageOutcome::Failed {
                    error: e.to_string(),
                }
            }
            Ok(Ok(Ok(items))) => {
                info!(stage = name, items, "stage complete");
                StageOutcome::Completed { items }
            }
        }
    }

    /// Operator escape hatch: clears the running flag without waiting.
    /// The underlying stage task, if any, is not killed and may still
    /// finish after the flag is cleared.
    pub fn reset(&self) -> bool {
        let mut state = self.lock_state();
        let was_running = state.running;
        if was_running {
            warn!("pipeline state reset while a run may still be in flight");
        }
        state.running = false;
        state.started_at = None;
        was_running
    }

    pub fn status(&self) -> RunStatus {
        let state = self.lock_state();
        RunStatus {
            running: state.running,
            started_at: state.started_at,
            last_run_at: state.last_run_at,
            last_result: state.last_result.clone(),
        }
    }
}
