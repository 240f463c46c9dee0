//! Schema migrations, one SQL file per version.
//!
//! Each step commits together with its `_migrations` record, so a failing
//! step leaves the database at the previous version.

use rusqlite::{params, Connection};

use crate::store::StoreError;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_translation_jobs",
        sql: include_str!("sql/001_create_translation_jobs.sql"),
    },
    Migration {
        version: 2,
        name: "create_content_tables",
        sql: include_str!("sql/002_create_content_tables.sql"),
    },
];

/// Applies pending migrations. Returns how many ran.
pub fn apply(conn: &mut Connection) -> Result<usize, StoreError> {
    apply_steps(conn, MIGRATIONS)
}

fn apply_steps(conn: &mut Connection, steps: &[Migration]) -> Result<usize, StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current: u32 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |r| {
            r.get(0)
        })?;
    let supported = steps.last().map_or(0, |m| m.version);
    if current > supported {
        return Err(StoreError::SchemaTooNew {
            found: current,
            supported,
        });
    }

    let mut applied = 0;
    for step in steps.iter().filter(|m| m.version > current) {
        log::info!("Running migration v{}: {}", step.version, step.name);

        let failed = |source| StoreError::Migration {
            version: step.version,
            name: step.name,
            source,
        };
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql).map_err(failed)?;
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            params![step.version, step.name],
        )
        .map_err(failed)?;
        tx.commit()?;
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded_versions(conn: &Connection) -> Vec<u32> {
        let mut stmt = conn
            .prepare("SELECT version FROM _migrations ORDER BY version")
            .unwrap();
        stmt.query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_fresh_database_gets_every_step_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(apply(&mut conn).unwrap(), MIGRATIONS.len());
        assert_eq!(apply(&mut conn).unwrap(), 0);
        assert_eq!(recorded_versions(&conn), vec![1, 2]);
    }

    #[test]
    fn test_jobs_table_stores_candidate_snapshot() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply(&mut conn).unwrap();

        conn.execute(
            "INSERT INTO translation_jobs (id, job_type, source_language, target_language,
             candidate_keys, created_at, updated_at)
             VALUES ('j1', 'i18n', 'en', 'fr', '[{\"kind\":\"i18n\",\"id\":\"a\"}]', 'now', 'now')",
            [],
        )
        .unwrap();
        let (status, snapshot): (String, String) = conn
            .query_row(
                "SELECT status, candidate_keys FROM translation_jobs WHERE id = 'j1'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, "pending");
        assert!(snapshot.contains("\"id\":\"a\""));
    }

    #[test]
    fn test_failed_step_is_rolled_back() {
        let steps = [
            Migration {
                version: 1,
                name: "good",
                sql: "CREATE TABLE alpha (id TEXT);",
            },
            Migration {
                version: 2,
                name: "broken",
                sql: "CREATE TABLE beta (id TEXT); INSERT INTO missing_table VALUES (1);",
            },
        ];
        let mut conn = Connection::open_in_memory().unwrap();

        let err = apply_steps(&mut conn, &steps).unwrap_err();
        assert!(matches!(err, StoreError::Migration { version: 2, .. }));
        assert_eq!(recorded_versions(&conn), vec![1]);

        let beta: u32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'beta'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(beta, 0);
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO _migrations (version, name) VALUES (99, 'from_the_future')",
            [],
        )
        .unwrap();

        let err = apply(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            StoreError::SchemaTooNew {
                found: 99,
                supported: 2
            }
        ));
    }

    #[test]
    fn test_translation_keys_are_unique_per_language() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply(&mut conn).unwrap();

        conn.execute(
            "INSERT INTO cms_item_translations (item_id, language_code, title) VALUES ('i1', 'en', 'A')",
            [],
        )
        .unwrap();
        let duplicate = conn.execute(
            "INSERT INTO cms_item_translations (item_id, language_code, title) VALUES ('i1', 'en', 'B')",
            [],
        );
        assert!(duplicate.is_err());
    }
}
