use tracing::debug;

use super::{Filter, Row, SelectQuery, StoreError, TableStore};

/// Reads every row matching `filters`, page by page.
///
/// Pages are requested at `page_size` (clamped to the store's own cap, so a
/// capped page is never mistaken for the last one) and the loop ends on the
/// first short or empty page.
pub async fn fetch_all(
    store: &dyn TableStore,
    table: &str,
    filters: &[Filter],
    columns: &[&str],
    order_by: &str,
    page_size: usize,
) -> Result<Vec<Row>, StoreError> {
    let page_size = match store.page_cap() {
        Some(cap) => page_size.min(cap),
        None => page_size,
    }
    .max(1);

    let mut rows = Vec::new();
    let mut offset = 0;
    loop {
        let mut query = SelectQuery::new(table)
            .columns(columns)
            .order_by(order_by)
            .range(offset, page_size);
        query.filters = filters.to_vec();

        let page = store.select(&query).await?;
        let fetched = page.len();
        rows.extend(page);

        if fetched < page_size {
            break;
        }
        offset += page_size;
    }

    debug!(table, rows = rows.len(), "fetched all rows");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        inner: SqliteStore,
        selects: AtomicUsize,
    }

    #[async_trait]
    impl TableStore for CountingStore {
        fn page_cap(&self) -> Option<usize> {
            self.inner.page_cap()
        }

        async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, StoreError> {
            self.selects.fetch_add(1, Ordering::SeqCst);
            self.inner.select(query).await
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

    fn seeded_store(rows: usize, max_rows: usize) -> CountingStore {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO translations (key, language_code, value) VALUES (?1, ?2, ?3)",
            )?;
            for i in 0..rows {
                stmt.execute(rusqlite::params![format!("k{:05}", i), "en", "v"])?;
            }
            stmt.execute(rusqlite::params!["other", "de", "v"])?;
            Ok(())
        })
        .unwrap();
        CountingStore {
            inner: SqliteStore::with_max_rows(db, max_rows),
            selects: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_fetches_past_the_page_cap() {
        let store = seeded_store(2500, 1000);
        let rows = fetch_all(
            &store,
            "translations",
            &[Filter::eq("language_code", "en")],
            &["key", "value"],
            "key",
            1000,
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 2500);
        assert_eq!(store.selects.load(Ordering::SeqCst), 3);
        assert_eq!(rows[0]["key"], "k00000");
        assert_eq!(rows[2499]["key"], "k02499");
    }

    #[tokio::test]
    async fn test_exact_multiple_of_page_size() {
        let store = seeded_store(2000, 1000);
        let rows = fetch_all(
            &store,
            "translations",
            &[Filter::eq("language_code", "en")],
            &["key"],
            "key",
            1000,
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 2000);
        // Two full pages and one empty page.
        assert_eq!(store.selects.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_page_size_above_store_cap_is_clamped() {
        let store = seeded_store(750, 300);
        let rows = fetch_all(
            &store,
            "translations",
            &[Filter::eq("language_code", "en")],
            &["key"],
            "key",
            1000,
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 750);
    }

    #[tokio::test]
    async fn test_empty_table() {
        let store = seeded_store(0, 1000);
        let rows = fetch_all(
            &store,
            "translations",
            &[Filter::eq("language_code", "en")],
            &["key"],
            "key",
            1000,
        )
        .await
        .unwrap();

        assert!(rows.is_empty());
        assert_eq!(store.selects.load(Ordering::SeqCst), 1);
    }
}
