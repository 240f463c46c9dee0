use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::candidates::{compute_candidates, id_of};
use super::content::{schema_for_kind, ContentSchema};
use super::error::PipelineError;
use super::progress::ProgressTracker;
use super::{PipelineSettings, RunOutcome};
use crate::job::{CandidateRef, JobRepository, TranslationJob};
use crate::store::{Filter, Row, SelectQuery, TableStore};
use crate::translate::{BatchItem, BatchTranslator};

/// Runs one invocation of a job: candidate snapshot, then batches until the
/// list is exhausted, the job is cancelled, or the time budget is spent.
pub struct Pipeline {
    store: Arc<dyn TableStore>,
    repo: JobRepository,
    translator: Arc<BatchTranslator>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn TableStore>,
        translator: Arc<BatchTranslator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            repo: JobRepository::new(store.clone()),
            store,
            translator,
            settings,
        }
    }

    /// Expects the job to be `processing` already.
    pub async fn run(&self, job: &TranslationJob) -> Result<RunOutcome, PipelineError> {
        let mut tracker = ProgressTracker::new(self.repo.clone(), job, self.settings.time_budget);

        let candidates = match job.candidates().map_err(PipelineError::CorruptSnapshot)? {
            Some(candidates) => {
                debug!(
                    total = candidates.len(),
                    position = tracker.position(),
                    "Resuming from saved candidate list"
                );
                candidates
            }
            None => {
                let candidates =
                    compute_candidates(self.store.as_ref(), job, self.settings.page_size).await?;
                self.repo.save_candidates(&job.id, &candidates).await?;
                info!(total = candidates.len(), "Candidate list saved");
                candidates
            }
        };

        if candidates.is_empty() {
            info!("Nothing to translate");
            return Ok(tracker.finish().await?);
        }

        let batch_size = self
            .settings
            .batch_size
            .max(1)
            .min(self.store.page_cap().unwrap_or(usize::MAX));
        let mut start = usize::try_from(tracker.position())
            .unwrap_or(usize::MAX)
            .min(candidates.len());

        while start < candidates.len() {
            if let Some(outcome) = tracker.poll().await? {
                info!(
                    processed = tracker.processed(),
                    "Stopping: job is no longer processing"
                );
                return Ok(outcome);
            }
            if tracker.out_of_time() {
                info!(
                    processed = tracker.processed(),
                    errors = tracker.errors(),
                    remaining = candidates.len() - start,
                    "Time budget spent, yielding"
                );
                return Ok(RunOutcome::Yielded);
            }

            let end = batch_end(&candidates, start, batch_size);
            let (processed, errors) = self.process_batch(job, &candidates[start..end]).await?;
            if errors > 0 {
                warn!(errors, batch_start = start, "Batch finished with errors");
            }
            tracker.commit(processed, errors).await?;
            start = end;

            if start < candidates.len() && !self.settings.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_batch_delay).await;
            }
        }

        let outcome = tracker.finish().await?;
        info!(
            processed = tracker.processed(),
            errors = tracker.errors(),
            "Job finished: {:?}",
            outcome
        );
        Ok(outcome)
    }

    /// Translates and writes one batch. Returns (processed, errors).
    async fn process_batch(
        &self,
        job: &TranslationJob,
        batch: &[CandidateRef],
    ) -> Result<(u64, u64), PipelineError> {
        let Some(first) = batch.first() else {
            return Ok((0, 0));
        };
        let schema = schema_for_kind(&first.kind)
            .ok_or_else(|| PipelineError::UnknownKind(first.kind.clone()))?;

        let sources = self.load_sources(schema, job, batch).await?;
        let mut missing = 0u64;
        let items: Vec<BatchItem<'_>> = batch
            .iter()
            .filter_map(|candidate| match sources.get(&candidate.id) {
                Some(row) => Some(BatchItem {
                    id: &candidate.id,
                    row,
                }),
                None => {
                    missing += 1;
                    None
                }
            })
            .collect();
        if missing > 0 {
            warn!(missing, kind = schema.kind, "Source records disappeared since the job started");
        }

        let translated = self
            .translator
            .translate_batch(&schema.shape, &items, &job.source_language, &job.target_language)
            .await?;

        let mut rows = Vec::with_capacity(items.len());
        for (item, fields) in items.iter().zip(translated) {
            rows.push(fields.map(|fields| target_row(schema, job, item, fields)));
        }

        let mut processed = 0u64;
        let mut errors = missing;
        for row in rows {
            let Some(row) = row else {
                errors += 1;
                continue;
            };
            match self
                .store
                .upsert(schema.table, &row, &schema.conflict_columns())
                .await
            {
                Ok(()) => processed += 1,
                Err(e) => {
                    warn!(kind = schema.kind, "Failed to save translation: {}", e);
                    errors += 1;
                }
            }
        }

        debug!(kind = schema.kind, processed, errors, "Batch done");
        Ok((processed, errors))
    }

    async fn load_sources(
        &self,
        schema: &ContentSchema,
        job: &TranslationJob,
        batch: &[CandidateRef],
    ) -> Result<HashMap<String, Row>, PipelineError> {
        let query = SelectQuery::new(schema.table)
            .columns(&schema.source_columns())
            .filter(Filter::eq(
                schema.language_column,
                job.source_language.as_str(),
            ))
            .filter(Filter::one_of(
                schema.id_column,
                batch.iter().map(|c| c.id.as_str()),
            ))
            .range(0, batch.len());

        Ok(self
            .store
            .select(&query)
            .await?
            .into_iter()
            .filter_map(|row| id_of(&row, schema.id_column).map(|id| (id, row)))
            .collect())
    }
}

/// End of the batch starting at `start`: at most `batch_size` candidates, all
/// of the same kind.
fn batch_end(candidates: &[CandidateRef], start: usize, batch_size: usize) -> usize {
    let limit = (start + batch_size).min(candidates.len());
    let kind = &candidates[start].kind;
    candidates[start..limit]
        .iter()
        .position(|c| &c.kind != kind)
        .map_or(limit, |offset| start + offset)
}

fn target_row(
    schema: &ContentSchema,
    job: &TranslationJob,
    item: &BatchItem<'_>,
    fields: Row,
) -> Row {
    let mut row = Row::new();
    row.insert(schema.id_column.to_string(), item.id.into());
    row.insert(
        schema.language_column.to_string(),
        job.target_language.as_str().into(),
    );
    for column in schema.carried_columns {
        if let Some(value) = item.row.get(*column) {
            row.insert(column.to_string(), value.clone());
        }
    }
    row.extend(fields);
    row
}
