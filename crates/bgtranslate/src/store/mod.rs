//! Row-oriented table store consumed by the translation pipelines.
//!
//! The pipelines only need three operations: ranged selects with simple
//! filters, filtered updates, and upserts against a conflict key. Updates take
//! the same filters as selects, which is how job status changes are made
//! conditional on the status the job still has.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod fetch;
pub mod sqlite;

pub use fetch::fetch_all;
pub use sqlite::SqliteStore;

/// A single table row keyed by column name.
pub type Row = serde_json::Map<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to open database '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to create database directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration v{version} ({name}) failed: {source}")]
    Migration {
        version: u32,
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database schema is at v{found} but this build only knows up to v{supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("Statement on '{table}' failed: {source}")]
    Query {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Store task failed: {0}")]
    Task(String),

    #[error("Cannot write an empty row to '{0}'")]
    EmptyRow(String),

    #[error("Refusing to update '{0}' without a filter")]
    Unfiltered(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Membership in a list; the filter value is a JSON array.
    In,
}

impl FilterOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Neq => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::In => "IN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            op: FilterOp::Gte,
            value: value.into(),
        }
    }

    pub fn lte(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            op: FilterOp::Lte,
            value: value.into(),
        }
    }

    pub fn one_of<I, V>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            column: column.to_string(),
            op: FilterOp::In,
            value: Value::Array(values.into_iter().map(Into::into).collect()),
        }
    }
}

/// A ranged read. Empty `columns` selects every column.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub table: String,
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    /// Ascending sort column.
    pub order_by: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by = Some(column.to_string());
        self
    }

    pub fn range(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Largest number of rows a single select can return, if the store caps it.
    fn page_cap(&self) -> Option<usize> {
        None
    }

    /// Returns the rows matching `query`. Implementations may cap the number
    /// of rows returned regardless of the requested limit.
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, StoreError>;

    /// Sets `values` on every row matching all `filters`. At least one filter
    /// is required. Returns the number of rows affected.
    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        values: &Row,
    ) -> Result<usize, StoreError>;

    /// Inserts `row`, or overwrites the non-key columns of the row that
    /// already holds the same `conflict_columns` values.
    async fn upsert(
        &self,
        table: &str,
        row: &Row,
        conflict_columns: &[&str],
    ) -> Result<(), StoreError>;
}

/// Only ASCII alphanumerics and underscores are accepted as table or column names.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("cms_item_translations"));
        assert!(is_valid_identifier("language_code"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("jobs;--"));
        assert!(!is_valid_identifier("a b"));
    }

    #[test]
    fn test_select_query_builder() {
        let query = SelectQuery::new("translations")
            .columns(&["key", "value"])
            .filter(Filter::eq("language_code", "en"))
            .order_by("key")
            .range(1000, 1000);

        assert_eq!(query.table, "translations");
        assert_eq!(query.columns, vec!["key", "value"]);
        assert_eq!(query.filters[0].value, json!("en"));
        assert_eq!(query.filters[0].op.as_sql(), "=");
        assert_eq!(query.offset, 1000);
        assert_eq!(query.limit, Some(1000));
    }
}
