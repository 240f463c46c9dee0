//! Test harness for isolated job execution.
//!
//! Every harness owns a fresh in-memory SQLite database with all migrations
//! applied, so tests never share state.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use bgtranslate::ai::RetryPolicy;
use bgtranslate::job::{NewJob, TranslationJob};
use bgtranslate::store::{Filter, Row, SqliteStore, TableStore};
use bgtranslate::{Database, JobDispatcher, JobRepository, PipelineSettings};

use super::fake_ai::FakeAi;

/// Pipeline settings for tests: no inter-batch delay and a generous budget.
pub fn settings(batch_size: usize) -> PipelineSettings {
    PipelineSettings {
        page_size: 1000,
        batch_size,
        time_budget: Duration::from_secs(60),
        inter_batch_delay: Duration::ZERO,
    }
}

pub struct TestHarness {
    pub db: Database,
    pub store: Arc<SqliteStore>,
    pub repo: JobRepository,
    pub ai: Arc<FakeAi>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_max_rows(1000)
    }

    /// Harness whose store returns at most `max_rows` rows per select.
    pub fn with_max_rows(max_rows: usize) -> Self {
        let db = Database::open_in_memory().expect("Failed to create test database");
        let store = Arc::new(SqliteStore::with_max_rows(db.clone(), max_rows));
        let repo = JobRepository::new(store.clone());
        Self {
            db,
            store,
            repo,
            ai: Arc::new(FakeAi::new()),
        }
    }

    pub fn dispatcher(&self, settings: PipelineSettings) -> JobDispatcher {
        self.dispatcher_over(self.store.clone(), settings)
    }

    /// Dispatcher reading and writing through `store` instead of the plain
    /// SQLite store, e.g. a wrapper that interferes with the run.
    pub fn dispatcher_over(
        &self,
        store: Arc<dyn TableStore>,
        settings: PipelineSettings,
    ) -> JobDispatcher {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        JobDispatcher::new(store, self.ai.clone(), settings, policy)
    }

    pub async fn create_job(&self, new_job: NewJob) -> TranslationJob {
        self.repo.create(&new_job).await.expect("create job")
    }

    pub async fn job(&self, id: &str) -> TranslationJob {
        self.repo
            .find(id)
            .await
            .expect("load job")
            .expect("job exists")
    }

    pub async fn insert(&self, table: &str, value: Value, conflict: &[&str]) {
        let Value::Object(row) = value else {
            panic!("row must be an object");
        };
        self.store.upsert(table, &row, conflict).await.expect("insert row");
    }

    /// Inserts `count` i18n keys `key.0000..` in one transaction.
    pub fn seed_i18n(&self, language: &str, count: usize) {
        let language = language.to_string();
        self.db
            .with_conn(move |conn| {
                let tx = conn.unchecked_transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO translations (key, language_code, value, namespace)
                         VALUES (?1, ?2, ?3, 'common')",
                    )?;
                    for i in 0..count {
                        stmt.execute(rusqlite::params![
                            format!("key.{:04}", i),
                            language,
                            format!("Value {}", i)
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .expect("seed translations");
    }

    pub async fn seed_cms_item(&self, id: &str, page_id: &str, language: &str, title: Option<&str>) {
        self.insert(
            "cms_items",
            json!({"id": id, "page_id": page_id, "section_id": "s1"}),
            &["id"],
        )
        .await;
        self.insert(
            "cms_item_translations",
            json!({
                "item_id": id,
                "language_code": language,
                "title": title,
                "description": format!("About {}", id),
                "cells": [
                    {"content": format!("Cell of {}", id), "button_text": "Open", "url": "/open", "order": 1}
                ]
            }),
            &["item_id", "language_code"],
        )
        .await;
    }

    pub async fn rows(&self, table: &str, filters: &[Filter]) -> Vec<Row> {
        bgtranslate::fetch_all(self.store.as_ref(), table, filters, &[], "rowid", 1000)
            .await
            .expect("select rows")
    }

    pub async fn count(&self, table: &str, language: &str) -> usize {
        self.rows(table, &[Filter::eq("language_code", language)])
            .await
            .len()
    }

    /// Simulates an operator resetting a job, e.g. after topping up credits.
    pub async fn set_status(&self, id: &str, status: &str) {
        let Value::Object(values) = json!({"status": status}) else {
            unreachable!();
        };
        self.store
            .update(bgtranslate::job::JOBS_TABLE, &[Filter::eq("id", id)], &values)
            .await
            .expect("update job status");
    }
}
