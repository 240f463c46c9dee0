//! Reads and writes of the `translation_jobs` table through the table store.
//!
//! Progress writes only touch the counter columns. Status writes only apply
//! while the job is still `pending` or `processing`, so a cancellation that
//! lands between a read and a write is never overwritten: `cancelled`,
//! `completed` and `failed` stay terminal.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;

use super::model::{CandidateRef, JobStatus, NewJob, TranslationJob};
use crate::store::{Filter, Row, SelectQuery, StoreError, TableStore};

pub const JOBS_TABLE: &str = "translation_jobs";

#[derive(Error, Debug)]
pub enum JobRepoError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Job '{id}' has an invalid record: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode candidate list: {0}")]
    Encode(#[source] serde_json::Error),
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

#[derive(Clone)]
pub struct JobRepository {
    store: Arc<dyn TableStore>,
}

impl JobRepository {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Inserts a new `pending` job.
    pub async fn create(&self, new_job: &NewJob) -> Result<TranslationJob, JobRepoError> {
        let timestamp = now();
        let job = TranslationJob {
            id: uuid::Uuid::new_v4().to_string(),
            job_type: new_job.job_type,
            source_language: new_job.source_language.clone(),
            target_language: new_job.target_language.clone(),
            mode: new_job.mode,
            scope_id: new_job.scope_id.clone(),
            status: JobStatus::Pending,
            total_keys: None,
            processed_keys: 0,
            errors: 0,
            error_message: None,
            candidate_keys: None,
            created_at: timestamp.clone(),
            updated_at: timestamp,
            completed_at: None,
        };

        let values = row(json!({
            "id": job.id,
            "job_type": job.job_type.as_str(),
            "source_language": job.source_language,
            "target_language": job.target_language,
            "mode": job.mode.as_str(),
            "scope_id": job.scope_id,
            "status": job.status.as_str(),
            "processed_keys": 0,
            "errors": 0,
            "created_at": job.created_at,
            "updated_at": job.updated_at,
        }));
        self.store.upsert(JOBS_TABLE, &values, &["id"]).await?;

        Ok(job)
    }

    pub async fn find(&self, id: &str) -> Result<Option<TranslationJob>, JobRepoError> {
        let rows = self
            .store
            .select(&SelectQuery::new(JOBS_TABLE).filter(Filter::eq("id", id)).range(0, 1))
            .await?;

        match rows.into_iter().next() {
            Some(row) => serde_json::from_value(Value::Object(row))
                .map(Some)
                .map_err(|source| JobRepoError::Decode {
                    id: id.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Reads only the status column. `None` if the job does not exist.
    pub async fn status(&self, id: &str) -> Result<Option<JobStatus>, JobRepoError> {
        let rows = self
            .store
            .select(
                &SelectQuery::new(JOBS_TABLE)
                    .columns(&["status"])
                    .filter(Filter::eq("id", id))
                    .range(0, 1),
            )
            .await?;

        match rows.into_iter().next() {
            Some(mut row) => {
                let status = row.remove("status").unwrap_or(Value::Null);
                serde_json::from_value(status)
                    .map(Some)
                    .map_err(|source| JobRepoError::Decode {
                        id: id.to_string(),
                        source,
                    })
            }
            None => Ok(None),
        }
    }

    /// Moves a `pending` (or resumed `processing`) job to `processing`.
    /// Returns `false` when the job is gone or already finished.
    pub async fn mark_processing(&self, id: &str) -> Result<bool, JobRepoError> {
        self.transition(
            id,
            json!({"status": JobStatus::Processing.as_str(), "updated_at": now()}),
        )
        .await
    }

    /// Freezes the candidate list and its size.
    pub async fn save_candidates(
        &self,
        id: &str,
        candidates: &[CandidateRef],
    ) -> Result<(), JobRepoError> {
        let encoded = serde_json::to_string(candidates).map_err(JobRepoError::Encode)?;
        self.update(
            id,
            json!({
                "total_keys": candidates.len() as u64,
                "candidate_keys": encoded,
                "updated_at": now(),
            }),
        )
        .await
    }

    pub async fn record_progress(
        &self,
        id: &str,
        processed_keys: u64,
        errors: u64,
    ) -> Result<(), JobRepoError> {
        self.update(
            id,
            json!({
                "processed_keys": processed_keys,
                "errors": errors,
                "updated_at": now(),
            }),
        )
        .await
    }

    /// Returns `false` when the job left `processing` first, e.g. it was
    /// cancelled after the last status poll.
    pub async fn mark_completed(
        &self,
        id: &str,
        processed_keys: u64,
        errors: u64,
    ) -> Result<bool, JobRepoError> {
        let timestamp = now();
        self.transition(
            id,
            json!({
                "status": JobStatus::Completed.as_str(),
                "processed_keys": processed_keys,
                "errors": errors,
                "updated_at": timestamp,
                "completed_at": timestamp,
            }),
        )
        .await
    }

    pub async fn mark_failed(&self, id: &str, message: &str) -> Result<bool, JobRepoError> {
        self.transition(
            id,
            json!({
                "status": JobStatus::Failed.as_str(),
                "error_message": message,
                "updated_at": now(),
            }),
        )
        .await
    }

    /// Flags a non-terminal job as cancelled. Returns `false` when the job is
    /// missing or already finished.
    pub async fn cancel(&self, id: &str) -> Result<bool, JobRepoError> {
        self.transition(
            id,
            json!({"status": JobStatus::Cancelled.as_str(), "updated_at": now()}),
        )
        .await
    }

    async fn update(&self, id: &str, values: Value) -> Result<(), JobRepoError> {
        self.store
            .update(JOBS_TABLE, &[Filter::eq("id", id)], &row(values))
            .await?;
        Ok(())
    }

    /// Status write guarded by the job still being active.
    async fn transition(&self, id: &str, values: Value) -> Result<bool, JobRepoError> {
        let filters = [
            Filter::eq("id", id),
            Filter::one_of(
                "status",
                [JobStatus::Pending.as_str(), JobStatus::Processing.as_str()],
            ),
        ];
        let affected = self.store.update(JOBS_TABLE, &filters, &row(values)).await?;
        Ok(affected > 0)
    }
}
