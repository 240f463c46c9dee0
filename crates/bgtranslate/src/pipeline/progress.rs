//! Per-job progress bookkeeping across batches and invocations.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::RunOutcome;
use crate::job::{JobRepoError, JobRepository, TranslationJob};

/// Tracks counters for one invocation and writes them back after each batch.
///
/// Counters start from the job's persisted values, so a resumed invocation
/// continues exactly where the previous one stopped.
pub struct ProgressTracker {
    repo: JobRepository,
    job_id: String,
    processed: u64,
    errors: u64,
    batches: usize,
    started: Instant,
    budget: Duration,
}

impl ProgressTracker {
    pub fn new(repo: JobRepository, job: &TranslationJob, budget: Duration) -> Self {
        Self {
            repo,
            job_id: job.id.clone(),
            processed: job.processed_keys,
            errors: job.errors,
            batches: 0,
            started: Instant::now(),
            budget,
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Index of the next candidate to handle.
    pub fn position(&self) -> u64 {
        self.processed + self.errors
    }

    /// Re-reads the job status. Returns the outcome to stop with when another
    /// actor moved the job out of `processing`.
    pub async fn poll(&self) -> Result<Option<RunOutcome>, JobRepoError> {
        Ok(RunOutcome::settled(self.repo.status(&self.job_id).await?))
    }

    /// True once the budget is spent. The first batch of an invocation always
    /// runs so every invocation makes progress.
    pub fn out_of_time(&self) -> bool {
        self.batches > 0 && self.started.elapsed() >= self.budget
    }

    /// Adds a batch's results and persists the counters. The status column is
    /// left alone.
    pub async fn commit(&mut self, processed: u64, errors: u64) -> Result<(), JobRepoError> {
        self.processed += processed;
        self.errors += errors;
        self.batches += 1;
        self.repo
            .record_progress(&self.job_id, self.processed, self.errors)
            .await?;
        debug!(
            processed = self.processed,
            errors = self.errors,
            batch = self.batches,
            "Progress saved"
        );
        Ok(())
    }

    /// Marks the job completed unless it left `processing` meanwhile, in
    /// which case the run ends the way that status says.
    pub async fn finish(&self) -> Result<RunOutcome, JobRepoError> {
        if self
            .repo
            .mark_completed(&self.job_id, self.processed, self.errors)
            .await?
        {
            return Ok(RunOutcome::Completed);
        }
        Ok(self.poll().await?.unwrap_or(RunOutcome::NotFound))
    }
}
