//! Durable record store contract.
//!
//! The runner calls the store from its single consumer task only, so
//! implementations need no internal concurrency beyond `Send + Sync`.

use crate::error::StoreResult;
use crate::types::{RecordId, SerializedRecord};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Append-only persistent queue of serialized records.
///
/// A store that outlives the process must pass its largest held id to
/// [`RecordId::advance_past`] when opened, before the pipeline starts.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persists exactly one record.
    async fn append(&self, record: &SerializedRecord) -> StoreResult<()>;

    /// Loads up to `max_count` records, oldest first.
    async fn load_oldest(&self, max_count: usize) -> StoreResult<Vec<SerializedRecord>>;

    /// Deletes every record whose id is in `ids`.
    ///
    /// Must be all-or-nothing: a failure leaves every record in place.
    async fn delete_by_ids(&self, ids: &[RecordId]) -> StoreResult<()>;

    /// Number of records currently held.
    async fn count(&self) -> StoreResult<usize>;
}

/// Volatile FIFO store.
///
/// Nothing survives the process; useful for hosts that only want batching
/// and for tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<SerializedRecord>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every held record, oldest first.
    pub fn records(&self) -> Vec<SerializedRecord> {
        self.records.lock().clone()
    }

    /// Number of held records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn append(&self, record: &SerializedRecord) -> StoreResult<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    async fn load_oldest(&self, max_count: usize) -> StoreResult<Vec<SerializedRecord>> {
        let records = self.records.lock();
        Ok(records.iter().take(max_count).cloned().collect())
    }

    async fn delete_by_ids(&self, ids: &[RecordId]) -> StoreResult<()> {
        self.records.lock().retain(|r| !ids.contains(&r.id));
        Ok(())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.len())
    }
}
