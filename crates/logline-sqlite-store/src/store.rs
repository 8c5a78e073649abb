//! `Store` implementation over a dedicated SQLite executor thread.

use crate::{migrations, queries, SqliteStoreError, SqliteStoreResult};
use async_trait::async_trait;
use logline::{RecordId, SerializedRecord, Store, StoreResult};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

/// In-memory databases are never shared, so they report this path.
const MEMORY_PATH: &str = ":memory:";

fn from_tokio_rusqlite(e: tokio_rusqlite::Error) -> SqliteStoreError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => SqliteStoreError::Sqlite(e),
        tokio_rusqlite::Error::Close(_) => {
            SqliteStoreError::Connection("Connection closed".to_string())
        }
        other => SqliteStoreError::Connection(other.to_string()),
    }
}

/// Durable record store backed by one SQLite file.
///
/// Every query runs on the connection's dedicated thread in FIFO order.
/// Cloning shares that connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
    path: String,
}

impl SqliteStore {
    /// Open (or create) a store at `path`.
    ///
    /// Creates missing parent directories, enables WAL mode and applies
    /// pending migrations.
    pub async fn open(path: &Path) -> SqliteStoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().to_string();
        info!(path = %path_str, "Opening record store");

        let conn = Connection::open(path)
            .await
            .map_err(|e| SqliteStoreError::Connection(e.to_string()))?;

        conn.call(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA temp_store = MEMORY;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
            Ok(())
        })
        .await
        .map_err(from_tokio_rusqlite)?;

        Self::init(conn, path_str).await
    }

    /// Open a private in-memory store. Nothing survives the process.
    pub async fn open_in_memory() -> SqliteStoreResult<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| SqliteStoreError::Connection(e.to_string()))?;
        Self::init(conn, MEMORY_PATH.to_string()).await
    }

    async fn init(conn: Connection, path: String) -> SqliteStoreResult<Self> {
        let store = Self { conn, path };
        store.call(migrations::run_migrations).await?;

        if let Some(max_id) = store.call(queries::max_record_id).await? {
            RecordId::advance_past(max_id);
            debug!(max_id = %max_id, "Record ids advanced past stored records");
        }

        info!(path = %store.path, "Record store ready");
        Ok(store)
    }

    /// Run a closure on the executor thread.
    ///
    /// Only SQL and row mapping belong inside the closure; anything else
    /// stalls every other query queued behind it.
    async fn call<F, T>(&self, f: F) -> SqliteStoreResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> SqliteStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let outer = self.conn.call(move |conn| Ok(f(conn))).await;
        match outer {
            Ok(inner) => inner,
            Err(e) => Err(from_tokio_rusqlite(e)),
        }
    }

    /// The database file path, or `:memory:`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Delete every stored record, returning how many were removed.
    pub async fn clear(&self) -> SqliteStoreResult<usize> {
        let removed = self.call(queries::clear_records).await?;
        info!(removed, "Cleared record store");
        Ok(removed)
    }

    /// Wait for queued queries, then shut down the executor thread.
    pub async fn close(self) -> SqliteStoreResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| SqliteStoreError::Connection(format!("Failed to close store: {:?}", e)))?;
        info!(path = %self.path, "Record store closed");
        Ok(())
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn append(&self, record: &SerializedRecord) -> StoreResult<()> {
        let record = record.clone();
        self.call(move |conn| queries::insert_record(conn, &record))
            .await?;
        Ok(())
    }

    async fn load_oldest(&self, max_count: usize) -> StoreResult<Vec<SerializedRecord>> {
        let records = self
            .call(move |conn| queries::load_oldest(conn, max_count))
            .await?;
        debug!(requested = max_count, loaded = records.len(), "Loaded records");
        Ok(records)
    }

    async fn delete_by_ids(&self, ids: &[RecordId]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids = ids.to_vec();
        self.call(move |conn| queries::delete_records(conn, &ids))
            .await?;
        Ok(())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.call(queries::count_records).await?)
    }
}
