use thiserror::Error;

use crate::job::JobRepoError;
use crate::store::StoreError;
use crate::translate::TranslateError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Store failed: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Job(#[from] JobRepoError),

    #[error("Saved candidate list is corrupt: {0}")]
    CorruptSnapshot(#[source] serde_json::Error),

    #[error("Unknown content kind '{0}' in candidate list")]
    UnknownKind(String),

    #[error(transparent)]
    Translate(#[from] TranslateError),
}
