//! Standalone query functions over a `&Connection`.
//!
//! `SqliteStore` runs these on its executor thread; they are public so
//! tools can inspect a store file directly.

use crate::SqliteStoreResult;
use logline::{DestinationId, LogType, RecordId, SerializedRecord};
use rusqlite::{params, Connection, Row};
use tracing::debug;

/// Insert one record.
pub fn insert_record(conn: &Connection, record: &SerializedRecord) -> SqliteStoreResult<()> {
    conn.prepare_cached(
        "INSERT INTO records (id, log_type, serializer_type, destination, payload, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?
    .execute(params![
        record.id.as_i64(),
        record.log_type.as_str(),
        record.serializer_type,
        record.destination.as_str(),
        record.payload,
        record.created_at_ms,
    ])?;
    Ok(())
}

/// Load up to `limit` records, oldest first.
pub fn load_oldest(conn: &Connection, limit: usize) -> SqliteStoreResult<Vec<SerializedRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, log_type, serializer_type, destination, payload, created_at
         FROM records ORDER BY created_at ASC, id ASC LIMIT ?1",
    )?;

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let records = stmt
        .query_map(params![limit], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Delete the given records in one transaction.
///
/// Either every listed record is removed or none is. Ids that no longer
/// exist are ignored.
pub fn delete_records(conn: &Connection, ids: &[RecordId]) -> SqliteStoreResult<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut deleted = 0;
    {
        let mut stmt = tx.prepare_cached("DELETE FROM records WHERE id = ?1")?;
        for id in ids {
            deleted += stmt.execute(params![id.as_i64()])?;
        }
    }
    tx.commit()?;

    debug!(requested = ids.len(), deleted, "Deleted records");
    Ok(deleted)
}

/// Number of stored records.
pub fn count_records(conn: &Connection) -> SqliteStoreResult<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Largest stored record id, if any.
pub fn max_record_id(conn: &Connection) -> SqliteStoreResult<Option<RecordId>> {
    let max: Option<i64> = conn.query_row("SELECT MAX(id) FROM records", [], |row| row.get(0))?;
    Ok(max.map(RecordId))
}

/// Delete every record.
pub fn clear_records(conn: &Connection) -> SqliteStoreResult<usize> {
    Ok(conn.execute("DELETE FROM records", [])?)
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<SerializedRecord> {
    Ok(SerializedRecord {
        id: RecordId(row.get(0)?),
        log_type: LogType::from_string(row.get::<_, String>(1)?),
        serializer_type: row.get(2)?,
        destination: DestinationId::from_string(row.get::<_, String>(3)?),
        payload: row.get(4)?,
        created_at_ms: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn record(id: i64, created_at_ms: i64, payload: &str) -> SerializedRecord {
        SerializedRecord {
            id: RecordId(id),
            log_type: LogType::from("click"),
            serializer_type: "logline.json".to_string(),
            destination: DestinationId::from("stdout"),
            payload: payload.to_string(),
            created_at_ms,
        }
    }

    #[test]
    fn load_orders_by_creation_then_id() {
        let conn = conn();
        insert_record(&conn, &record(30, 2_000, "late")).unwrap();
        insert_record(&conn, &record(20, 1_000, "second")).unwrap();
        insert_record(&conn, &record(10, 1_000, "first")).unwrap();

        let payloads: Vec<String> = load_oldest(&conn, 10)
            .unwrap()
            .into_iter()
            .map(|r| r.payload)
            .collect();
        assert_eq!(payloads, vec!["first", "second", "late"]);
    }

    #[test]
    fn load_respects_limit() {
        let conn = conn();
        for i in 0..5 {
            insert_record(&conn, &record(i, i, "x")).unwrap();
        }
        assert_eq!(load_oldest(&conn, 2).unwrap().len(), 2);
        assert_eq!(load_oldest(&conn, 0).unwrap().len(), 0);
    }

    #[test]
    fn record_round_trips_every_column() {
        let conn = conn();
        let original = record(7, 1_234, r#"{"id":1}"#);
        insert_record(&conn, &original).unwrap();

        assert_eq!(load_oldest(&conn, 1).unwrap(), vec![original]);
    }

    #[test]
    fn delete_ignores_missing_ids() {
        let conn = conn();
        insert_record(&conn, &record(1, 1, "a")).unwrap();
        insert_record(&conn, &record(2, 2, "b")).unwrap();

        let deleted = delete_records(&conn, &[RecordId(1), RecordId(99)]).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(count_records(&conn).unwrap(), 1);
    }

    #[test]
    fn duplicate_id_is_an_error() {
        let conn = conn();
        insert_record(&conn, &record(1, 1, "a")).unwrap();
        assert!(insert_record(&conn, &record(1, 2, "b")).is_err());
    }

    #[test]
    fn max_record_id_tracks_largest_id() {
        let conn = conn();
        assert_eq!(max_record_id(&conn).unwrap(), None);

        insert_record(&conn, &record(7, 100, "a")).unwrap();
        insert_record(&conn, &record(3, 50, "b")).unwrap();
        assert_eq!(max_record_id(&conn).unwrap(), Some(RecordId(7)));
    }

    #[test]
    fn clear_removes_everything() {
        let conn = conn();
        for i in 0..3 {
            insert_record(&conn, &record(i, i, "x")).unwrap();
        }
        assert_eq!(clear_records(&conn).unwrap(), 3);
        assert_eq!(count_records(&conn).unwrap(), 0);
    }
}
