use std::fmt;

use serde::{Deserialize, Serialize};

/// Content pipeline a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    I18n,
    Cms,
    Training,
    Knowledge,
    HealthyKnowledge,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::I18n => "i18n",
            JobType::Cms => "cms",
            JobType::Training => "training",
            JobType::Knowledge => "knowledge",
            JobType::HealthyKnowledge => "healthy_knowledge",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which records a job selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    /// Only records without a target-language counterpart.
    Missing,
    /// Every source record; existing translations are overwritten.
    All,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobMode::Missing => "missing",
            JobMode::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Completed, failed and cancelled jobs never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a job's frozen candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateRef {
    /// Name of the content schema the record belongs to.
    pub kind: String,
    pub id: String,
}

/// Persisted job row, also returned to pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationJob {
    pub id: String,
    pub job_type: JobType,
    pub source_language: String,
    pub target_language: String,
    pub mode: JobMode,
    #[serde(default)]
    pub scope_id: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub total_keys: Option<u64>,
    #[serde(default)]
    pub processed_keys: u64,
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub error_message: Option<String>,
    /// JSON-encoded `Vec<CandidateRef>`, written once when the job first runs.
    #[serde(default, skip_serializing)]
    pub candidate_keys: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl TranslationJob {
    /// Number of candidates already accounted for, successfully or not.
    /// Resumed invocations continue from this index.
    pub fn position(&self) -> u64 {
        self.processed_keys + self.errors
    }

    /// The frozen candidate list, if one was saved.
    pub fn candidates(&self) -> Result<Option<Vec<CandidateRef>>, serde_json::Error> {
        self.candidate_keys
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }
}

/// Parameters for creating a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub job_type: JobType,
    pub source_language: String,
    pub target_language: String,
    pub mode: JobMode,
    #[serde(default)]
    pub scope_id: Option<String>,
}

impl NewJob {
    pub fn new(job_type: JobType, source_language: &str, target_language: &str) -> Self {
        Self {
            job_type,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            mode: JobMode::Missing,
            scope_id: None,
        }
    }

    pub fn with_mode(mut self, mode: JobMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_scope(mut self, scope_id: &str) -> Self {
        self.scope_id = Some(scope_id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_type_names() {
        for job_type in [
            JobType::I18n,
            JobType::Cms,
            JobType::Training,
            JobType::Knowledge,
            JobType::HealthyKnowledge,
        ] {
            let encoded = serde_json::to_value(job_type).unwrap();
            assert_eq!(encoded, json!(job_type.as_str()));
            assert_eq!(serde_json::from_value::<JobType>(encoded).unwrap(), job_type);
        }
        assert!(serde_json::from_value::<JobType>(json!("glossary")).is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_decode_job_row() {
        let row = json!({
            "id": "job-1",
            "job_type": "healthy_knowledge",
            "source_language": "en",
            "target_language": "es",
            "mode": "all",
            "scope_id": null,
            "status": "processing",
            "total_keys": 40,
            "processed_keys": 20,
            "errors": 3,
            "error_message": null,
            "candidate_keys": "[{\"kind\":\"knowledge\",\"id\":\"a1\"}]",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
            "completed_at": null
        });
        let job: TranslationJob = serde_json::from_value(row).unwrap();
        assert_eq!(job.job_type, JobType::HealthyKnowledge);
        assert_eq!(job.mode, JobMode::All);
        assert_eq!(job.position(), 23);

        let candidates = job.candidates().unwrap().unwrap();
        assert_eq!(
            candidates,
            vec![CandidateRef {
                kind: "knowledge".to_string(),
                id: "a1".to_string()
            }]
        );

        // The candidate snapshot is internal and never shown to pollers.
        let public = serde_json::to_value(&job).unwrap();
        assert!(public.get("candidate_keys").is_none());
    }

    #[test]
    fn test_unknown_job_type_fails_to_decode() {
        let row = json!({
            "id": "job-1", "job_type": "glossary", "source_language": "en",
            "target_language": "es", "mode": "all", "status": "pending",
            "created_at": "x", "updated_at": "x"
        });
        assert!(serde_json::from_value::<TranslationJob>(row).is_err());
    }
}
