//! The translation job record and its persistence.

pub mod model;
pub mod repo;

pub use model::{CandidateRef, JobMode, JobStatus, JobType, NewJob, TranslationJob};
pub use repo::{JobRepoError, JobRepository, JOBS_TABLE};
