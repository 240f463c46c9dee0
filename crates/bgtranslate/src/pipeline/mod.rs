pub mod candidates;
pub mod content;
pub mod error;
pub mod progress;
pub mod runner;

use std::time::Duration;

use crate::job::JobStatus;

pub use candidates::compute_candidates;
pub use content::{schema_for_kind, schemas_for, ContentSchema, Scope};
pub use error::PipelineError;
pub use progress::ProgressTracker;
pub use runner::Pipeline;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Rows requested per paginated read.
    pub page_size: usize,
    /// Records per AI call.
    pub batch_size: usize,
    /// Wall-clock budget of one invocation, measured from pipeline start.
    pub time_budget: Duration,
    /// Pause between batches.
    pub inter_batch_delay: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            batch_size: 20,
            time_budget: Duration::from_secs(25),
            inter_batch_delay: Duration::from_millis(100),
        }
    }
}

/// How one invocation of a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every candidate was handled and the job is `completed`.
    Completed,
    /// The job was flagged `cancelled` and the run stopped.
    Cancelled,
    /// The time budget ran out; the job stays `processing` and resumes on
    /// the next invocation.
    Yielded,
    /// The job was marked `failed` with this message.
    Failed(String),
    /// The job was already in a terminal state; nothing was done.
    AlreadyFinished(JobStatus),
    NotFound,
}

impl RunOutcome {
    /// Whether another invocation would do more work.
    pub fn should_resume(&self) -> bool {
        matches!(self, RunOutcome::Yielded)
    }

    /// The outcome a run stops with when the job's current status no longer
    /// lets it proceed. `None` while the job is still active.
    pub fn settled(status: Option<JobStatus>) -> Option<RunOutcome> {
        match status {
            None => Some(RunOutcome::NotFound),
            Some(JobStatus::Cancelled) => Some(RunOutcome::Cancelled),
            Some(status) if status.is_terminal() => Some(RunOutcome::AlreadyFinished(status)),
            Some(_) => None,
        }
    }
}
