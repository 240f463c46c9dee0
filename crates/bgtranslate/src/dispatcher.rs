//! Entry point for one invocation of a job.

use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument, Span};

use crate::ai::{CompletionClient, HttpCompletionClient, RetryPolicy};
use crate::config::Config;
use crate::job::{JobRepoError, JobRepository};
use crate::pipeline::{Pipeline, PipelineSettings, RunOutcome};
use crate::store::TableStore;
use crate::translate::BatchTranslator;

/// Loads a job, guards its state and hands it to the pipeline.
///
/// This is the single place where a job is marked `failed`: any error the
/// pipeline returns ends up in the job's `error_message`, unless the job was
/// cancelled first.
pub struct JobDispatcher {
    repo: JobRepository,
    pipeline: Pipeline,
}

impl JobDispatcher {
    pub fn new(
        store: Arc<dyn TableStore>,
        client: Arc<dyn CompletionClient>,
        settings: PipelineSettings,
        policy: RetryPolicy,
    ) -> Self {
        let translator = Arc::new(BatchTranslator::new(client, policy));
        Self {
            repo: JobRepository::new(store.clone()),
            pipeline: Pipeline::new(store, translator, settings),
        }
    }

    /// Production constructor: HTTP completion client built from `config.ai`.
    pub fn from_config(config: &Config, store: Arc<dyn TableStore>) -> crate::Result<Self> {
        let client = Arc::new(HttpCompletionClient::from_config(&config.ai)?);
        Ok(Self::new(
            store,
            client,
            config.pipeline_settings(),
            config.retry_policy(),
        ))
    }

    pub fn repository(&self) -> &JobRepository {
        &self.repo
    }

    pub async fn run(&self, job_id: &str) -> RunOutcome {
        let span = info_span!("job", job_id = %job_id, job_type = tracing::field::Empty);
        self.dispatch(job_id).instrument(span).await
    }

    async fn dispatch(&self, job_id: &str) -> RunOutcome {
        let job = match self.repo.find(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!("Job not found");
                return RunOutcome::NotFound;
            }
            Err(JobRepoError::Decode { source, .. }) => {
                return self.fail(job_id, format!("Invalid job record: {}", source)).await;
            }
            Err(e) => {
                error!("Failed to load job: {}", e);
                return RunOutcome::Failed(e.to_string());
            }
        };
        Span::current().record("job_type", job.job_type.as_str());

        if job.status.is_terminal() {
            info!(status = %job.status, "Job already finished, nothing to do");
            return RunOutcome::AlreadyFinished(job.status);
        }

        match self.repo.mark_processing(job_id).await {
            Ok(true) => {}
            Ok(false) => return self.settled(job_id).await,
            Err(e) => {
                error!("Failed to mark job processing: {}", e);
                return RunOutcome::Failed(e.to_string());
            }
        }
        info!(
            mode = job.mode.as_str(),
            source = %job.source_language,
            target = %job.target_language,
            position = job.position(),
            "Job started"
        );

        match self.pipeline.run(&job).await {
            Ok(outcome) => outcome,
            Err(e) => self.fail(job_id, e.to_string()).await,
        }
    }

    async fn fail(&self, job_id: &str, message: String) -> RunOutcome {
        error!("Job failed: {}", message);
        match self.repo.mark_failed(job_id, &message).await {
            Ok(true) => RunOutcome::Failed(message),
            Ok(false) => self.settled(job_id).await,
            Err(e) => {
                error!("Failed to record job failure: {}", e);
                RunOutcome::Failed(message)
            }
        }
    }

    /// Outcome for a job whose status changed under us between reading and
    /// writing it.
    async fn settled(&self, job_id: &str) -> RunOutcome {
        match self.repo.status(job_id).await {
            Ok(status) => {
                let outcome = RunOutcome::settled(status).unwrap_or(RunOutcome::NotFound);
                info!("Job status changed concurrently: {:?}", outcome);
                outcome
            }
            Err(e) => {
                error!("Failed to re-read job status: {}", e);
                RunOutcome::Failed(e.to_string())
            }
        }
    }
}
