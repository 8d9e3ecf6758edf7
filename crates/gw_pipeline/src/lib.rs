pub mod quota;
pub mod runner;
pub mod scheduler;
pub mod summarize;

pub use quota::{QuotaState, QuotaTracker};
pub use runner::{PipelineRunner, RunReport, RunStatus, StageOutcome, TriggerError};
pub use summarize::SummarizeStage;
