//! `TableStore` over the SQLite `Database`.

use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;

use super::{is_valid_identifier, Filter, FilterOp, Row, SelectQuery, StoreError, TableStore};
use crate::db::Database;

/// Rows returned by a single select when no cap is configured.
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// SQLite-backed table store.
///
/// Every select is capped at `max_rows`, whatever limit the caller asks for,
/// the same way hosted table APIs cap their responses.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
    max_rows: usize,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self::with_max_rows(db, DEFAULT_MAX_ROWS)
    }

    pub fn with_max_rows(db: Database, max_rows: usize) -> Self {
        Self {
            db,
            max_rows: max_rows.max(1),
        }
    }

    /// Runs one statement against `table` on the blocking pool.
    async fn run<T, F>(&self, table: &str, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let table = table.to_string();
        tokio::task::spawn_blocking(move || {
            db.with_conn(|conn| f(conn).map_err(|source| StoreError::Query { table, source }))
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl TableStore for SqliteStore {
    fn page_cap(&self) -> Option<usize> {
        Some(self.max_rows)
    }

    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, StoreError> {
        let (sql, params) = build_select(query, self.max_rows)?;
        log::trace!("select: {}", sql);

        self.run(&query.table, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
            let rows = stmt
                .query_map(params_from_iter(params.iter()), |row| {
                    let mut map = Row::new();
                    for (i, name) in names.iter().enumerate() {
                        map.insert(name.clone(), from_sql(row.get_ref(i)?));
                    }
                    Ok(map)
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        values: &Row,
    ) -> Result<usize, StoreError> {
        check_identifier(table)?;
        if values.is_empty() {
            return Err(StoreError::EmptyRow(table.to_string()));
        }
        if filters.is_empty() {
            return Err(StoreError::Unfiltered(table.to_string()));
        }

        let mut assignments = Vec::with_capacity(values.len());
        let mut params = Vec::with_capacity(values.len() + filters.len());
        for (column, value) in values {
            check_identifier(column)?;
            params.push(to_sql(value));
            assignments.push(format!("{} = ?{}", column, params.len()));
        }
        let conditions = build_conditions(filters, &mut params)?;
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            assignments.join(", "),
            conditions.join(" AND ")
        );
        log::trace!("update: {}", sql);

        self.run(table, move |conn| conn.execute(&sql, params_from_iter(params.iter())))
            .await
    }

    async fn upsert(
        &self,
        table: &str,
        row: &Row,
        conflict_columns: &[&str],
    ) -> Result<(), StoreError> {
        check_identifier(table)?;
        if row.is_empty() {
            return Err(StoreError::EmptyRow(table.to_string()));
        }
        for column in conflict_columns {
            check_identifier(column)?;
            if !row.contains_key(*column) {
                return Err(StoreError::InvalidIdentifier(format!(
                    "{} (conflict column missing from row)",
                    column
                )));
            }
        }

        let mut columns = Vec::with_capacity(row.len());
        let mut placeholders = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());
        for (column, value) in row {
            check_identifier(column)?;
            params.push(to_sql(value));
            columns.push(column.as_str());
            placeholders.push(format!("?{}", params.len()));
        }

        let updates: Vec<String> = columns
            .iter()
            .filter(|c| !conflict_columns.contains(*c))
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        let on_conflict = if conflict_columns.is_empty() {
            String::new()
        } else if updates.is_empty() {
            format!(" ON CONFLICT({}) DO NOTHING", conflict_columns.join(", "))
        } else {
            format!(
                " ON CONFLICT({}) DO UPDATE SET {}",
                conflict_columns.join(", "),
                updates.join(", ")
            )
        };
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}){}",
            table,
            columns.join(", "),
            placeholders.join(", "),
            on_conflict
        );

        self.run(table, move |conn| {
            conn.execute(&sql, params_from_iter(params.iter()))?;
            Ok(())
        })
        .await
    }
}

fn check_identifier(name: &str) -> Result<(), StoreError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Turns `filters` into SQL conditions, appending their values to `params`.
fn build_conditions(
    filters: &[Filter],
    params: &mut Vec<SqlValue>,
) -> Result<Vec<String>, StoreError> {
    let mut conditions = Vec::with_capacity(filters.len());
    for filter in filters {
        check_identifier(&filter.column)?;
        if filter.op == FilterOp::In {
            let values = match filter.value {
                Value::Array(ref values) => values.as_slice(),
                ref single => std::slice::from_ref(single),
            };
            if values.is_empty() {
                conditions.push("0 = 1".to_string());
                continue;
            }
            let mut placeholders = Vec::with_capacity(values.len());
            for value in values {
                params.push(to_sql(value));
                placeholders.push(format!("?{}", params.len()));
            }
            conditions.push(format!("{} IN ({})", filter.column, placeholders.join(", ")));
            continue;
        }
        params.push(to_sql(&filter.value));
        conditions.push(format!(
            "{} {} ?{}",
            filter.column,
            filter.op.as_sql(),
            params.len()
        ));
    }
    Ok(conditions)
}

fn build_select(query: &SelectQuery, max_rows: usize) -> Result<(String, Vec<SqlValue>), StoreError> {
    check_identifier(&query.table)?;
    for column in &query.columns {
        check_identifier(column)?;
    }

    let projection = if query.columns.is_empty() {
        "*".to_string()
    } else {
        query.columns.join(", ")
    };

    let mut params = Vec::with_capacity(query.filters.len() + 2);
    let conditions = build_conditions(&query.filters, &mut params)?;

    let mut sql = format!("SELECT {} FROM {}", projection, query.table);
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    if let Some(ref order_by) = query.order_by {
        check_identifier(order_by)?;
        sql.push_str(&format!(" ORDER BY {} ASC", order_by));
    }

    let limit = query.limit.unwrap_or(max_rows).min(max_rows);
    params.push(SqlValue::Integer(limit as i64));
    params.push(SqlValue::Integer(query.offset as i64));
    sql.push_str(&format!(
        " LIMIT ?{} OFFSET ?{}",
        params.len() - 1,
        params.len()
    ));

    Ok((sql, params))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        // Nested structures (CMS cells) are stored as JSON text.
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            Value::String(String::from_utf8_lossy(t).into_owned())
        }
    }
}
