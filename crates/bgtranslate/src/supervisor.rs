//! Detached execution of jobs under a watchdog.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::dispatcher::JobDispatcher;
use crate::pipeline::RunOutcome;

#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorSettings {
    /// Hard limit for a single invocation. Must exceed the time budget plus
    /// the longest a single batch can take, retries included.
    pub watchdog_timeout: Duration,
    /// Re-dispatch a job that yielded on its time budget.
    pub auto_resume: bool,
    pub max_resumes: u32,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            watchdog_timeout: Duration::from_secs(300),
            auto_resume: true,
            max_resumes: 50,
        }
    }
}

/// Runs the job on a detached task and returns immediately.
///
/// The handle resolves to the last outcome, or `None` when the watchdog fired
/// or the invocation panicked. Neither is propagated to the caller.
pub fn spawn(
    dispatcher: Arc<JobDispatcher>,
    job_id: String,
    settings: SupervisorSettings,
) -> JoinHandle<Option<RunOutcome>> {
    tokio::spawn(supervise(dispatcher, job_id, settings))
}

async fn supervise(
    dispatcher: Arc<JobDispatcher>,
    job_id: String,
    settings: SupervisorSettings,
) -> Option<RunOutcome> {
    let mut resumes = 0u32;
    loop {
        let mut invocation = {
            let dispatcher = dispatcher.clone();
            let job_id = job_id.clone();
            tokio::spawn(async move { dispatcher.run(&job_id).await })
        };

        let outcome = match tokio::time::timeout(settings.watchdog_timeout, &mut invocation).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(job_id = %job_id, "Job invocation panicked: {}", e);
                return None;
            }
            Err(_) => {
                invocation.abort();
                error!(
                    job_id = %job_id,
                    timeout_secs = settings.watchdog_timeout.as_secs(),
                    "Job invocation exceeded the watchdog timeout and was aborted"
                );
                return None;
            }
        };

        if outcome.should_resume() && settings.auto_resume {
            if resumes < settings.max_resumes {
                resumes += 1;
                debug!(job_id = %job_id, resumes, "Resuming yielded job");
                continue;
            }
            info!(
                job_id = %job_id,
                resumes,
                "Resume limit reached, job left processing for a later invocation"
            );
        }
        return Some(outcome);
    }
}
