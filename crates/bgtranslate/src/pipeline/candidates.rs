//! Computes the ordered list of records a job translates.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use super::content::{schemas_for, ContentSchema, Scope};
use crate::job::{CandidateRef, JobMode, TranslationJob};
use crate::store::{fetch_all, Filter, Row, StoreError, TableStore};

/// Reads a row's identifier as text.
pub(crate) fn id_of(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Source-language records of every content kind of the job, minus the ones
/// already translated when the job runs in `missing` mode.
pub async fn compute_candidates(
    store: &dyn TableStore,
    job: &TranslationJob,
    page_size: usize,
) -> Result<Vec<CandidateRef>, StoreError> {
    let mut candidates = Vec::new();
    for schema in schemas_for(job.job_type) {
        let found = candidates_for(store, schema, job, page_size).await?;
        debug!(kind = schema.kind, count = found.len(), "Candidates selected");
        candidates.extend(found);
    }
    Ok(candidates)
}

async fn candidates_for(
    store: &dyn TableStore,
    schema: &ContentSchema,
    job: &TranslationJob,
    page_size: usize,
) -> Result<Vec<CandidateRef>, StoreError> {
    let mut filters = vec![Filter::eq(
        schema.language_column,
        job.source_language.as_str(),
    )];
    let mut in_scope: Option<HashSet<String>> = None;

    if let (Some(scope_id), Some(scope)) = (
        job.scope_id.as_deref().filter(|s| !s.is_empty()),
        schema.scope,
    ) {
        match scope {
            Scope::Direct(column) => filters.push(Filter::eq(column, scope_id)),
            Scope::Parent {
                table,
                id_column,
                column,
            } => {
                let parents = fetch_all(
                    store,
                    table,
                    &[Filter::eq(column, scope_id)],
                    &[id_column],
                    id_column,
                    page_size,
                )
                .await?;
                in_scope = Some(parents.iter().filter_map(|r| id_of(r, id_column)).collect());
            }
        }
    }

    let source = fetch_all(
        store,
        schema.table,
        &filters,
        &[schema.id_column],
        schema.id_column,
        page_size,
    )
    .await?;

    let translated: HashSet<String> = match job.mode {
        JobMode::All => HashSet::new(),
        JobMode::Missing => fetch_all(
            store,
            schema.table,
            &[Filter::eq(
                schema.language_column,
                job.target_language.as_str(),
            )],
            &[schema.id_column, schema.presence_field],
            schema.id_column,
            page_size,
        )
        .await?
        .iter()
        .filter(|row| row.get(schema.presence_field).is_some_and(|v| !v.is_null()))
        .filter_map(|row| id_of(row, schema.id_column))
        .collect(),
    };

    Ok(source
        .iter()
        .filter_map(|row| id_of(row, schema.id_column))
        .filter(|id| in_scope.as_ref().map_or(true, |ids| ids.contains(id)))
        .filter(|id| !translated.contains(id))
        .map(|id| CandidateRef {
            kind: schema.kind.to_string(),
            id,
        })
        .collect())
}
