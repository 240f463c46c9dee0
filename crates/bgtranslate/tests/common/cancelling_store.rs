//! Table store that cancels a job at a chosen point of a run.
//!
//! Reads pass through to the wrapped store; right after the chosen read the
//! job is flipped to `cancelled`, the way an operator racing the worker would.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use bgtranslate::job::JOBS_TABLE;
use bgtranslate::store::{Filter, Row, SelectQuery, SqliteStore, StoreError, TableStore};
use bgtranslate::JobRepository;

#[derive(Debug, Clone, Copy)]
pub enum CancelPoint {
    /// After the dispatcher has loaded the full job row.
    AfterJobLoad,
    /// After the n-th (1-based) status-only read of the job.
    AfterStatusRead(usize),
}

pub struct CancellingStore {
    inner: Arc<SqliteStore>,
    repo: JobRepository,
    job_id: String,
    point: CancelPoint,
    status_reads: AtomicUsize,
    fired: AtomicBool,
}

impl CancellingStore {
    pub fn new(inner: Arc<SqliteStore>, job_id: &str, point: CancelPoint) -> Self {
        Self {
            repo: JobRepository::new(inner.clone()),
            inner,
            job_id: job_id.to_string(),
            point,
            status_reads: AtomicUsize::new(0),
            fired: AtomicBool::new(false),
        }
    }

    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    fn triggers(&self, query: &SelectQuery) -> bool {
        if query.table != JOBS_TABLE {
            return false;
        }
        match self.point {
            CancelPoint::AfterJobLoad => query.columns.is_empty(),
            CancelPoint::AfterStatusRead(n) => {
                query.columns == ["status"]
                    && self.status_reads.fetch_add(1, Ordering::SeqCst) + 1 == n
            }
        }
    }
}

#[async_trait]
impl TableStore for CancellingStore {
    fn page_cap(&self) -> Option<usize> {
        self.inner.page_cap()
    }

    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, StoreError> {
        let rows = self.inner.select(query).await?;
        if self.triggers(query) && !self.fired.swap(true, Ordering::SeqCst) {
            let cancelled = self.repo.cancel(&self.job_id).await.expect("cancel job");
            assert!(cancelled, "job should still be active when cancelled");
        }
        Ok(rows)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        values: &Row,
    ) -> Result<usize, StoreError> {
        self.inner.update(table, filters, values).await
    }

    async fn upsert(
        &self,
        table: &str,
        row: &Row,
        conflict_columns: &[&str],
    ) -> Result<(), StoreError> {
        self.inner.upsert(table, row, conflict_columns).await
    }
}
