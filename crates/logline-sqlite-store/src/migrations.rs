//! Schema migrations.
//!
//! Applied versions are tracked in the `migrations` table.

use crate::SqliteStoreResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> SqliteStoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version >= CURRENT_VERSION {
        debug!(current_version, "Schema up to date");
        return Ok(());
    }

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_records(conn)?;
    }

    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> SqliteStoreResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: records table ordered by creation time.
fn migrate_v1_records(conn: &Connection) -> SqliteStoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY,
            log_type TEXT NOT NULL,
            serializer_type TEXT NOT NULL,
            destination TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_records_created_at ON records(created_at, id);
        ",
    )?;
    record_migration(conn, 1, "records")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_run_successfully() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(tables.contains(&"records".to_string()));
        assert!(tables.contains(&"migrations".to_string()));
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let applied: i32 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, CURRENT_VERSION);
    }
}
