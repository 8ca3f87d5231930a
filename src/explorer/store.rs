//! Connection Registry
//!
//! Process-wide lookup from `ConnectionId` to the shared `ConnectionRecord`.
//! Records are handed out as `Arc`s so views always see live state; callers
//! keep ids and re-resolve through the registry instead of caching records.
//!
//! Enrichment updates are best effort: an update that cannot be resolved is
//! skipped and logged at debug level, never reported as an error.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::engine::types::RowObject;
use crate::explorer::model::{ColumnNode, ConnectionId, ConnectionRecord};

/// A record shared between the registry and the views reading it
pub type SharedRecord = Arc<RwLock<ConnectionRecord>>;

pub fn share(record: ConnectionRecord) -> SharedRecord {
    Arc::new(RwLock::new(record))
}

pub(crate) fn read_record(record: &SharedRecord) -> RwLockReadGuard<'_, ConnectionRecord> {
    record.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_record(record: &SharedRecord) -> RwLockWriteGuard<'_, ConnectionRecord> {
    record.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Entries {
    order: Vec<ConnectionId>,
    records: HashMap<ConnectionId, SharedRecord>,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    entries: RwLock<Entries>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces the record at `id`. Replacing keeps the original
    /// insertion position.
    pub fn put(&self, id: ConnectionId, record: SharedRecord) {
        let mut entries = self.write();
        if entries.records.insert(id, record).is_none() {
            entries.order.push(id);
        }
    }

    pub fn get(&self, id: &ConnectionId) -> Option<SharedRecord> {
        self.read().records.get(id).cloned()
    }

    /// Snapshot of all records in insertion order
    pub fn get_all(&self) -> Vec<SharedRecord> {
        let entries = self.read();
        entries
            .order
            .iter()
            .filter_map(|id| entries.records.get(id).cloned())
            .collect()
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        self.read().order.clone()
    }

    pub fn remove(&self, id: &ConnectionId) -> Option<SharedRecord> {
        let mut entries = self.write();
        let removed = entries.records.remove(id);
        if removed.is_some() {
            entries.order.retain(|existing| existing != id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn update_table_columns(
        &self,
        id: &ConnectionId,
        schema: &str,
        table: &str,
        columns: Vec<ColumnNode>,
    ) -> bool {
        let applied = match self.get(id) {
            Some(record) => {
                let mut guard = write_record(&record);
                guard.update_table_columns(schema, table, columns)
            }
            None => false,
        };
        if !applied {
            tracing::debug!(connection_id = %id, schema, table, "column update skipped");
        }
        applied
    }

    pub fn update_table_rows(
        &self,
        id: &ConnectionId,
        schema: &str,
        table: &str,
        rows: Vec<RowObject>,
        total_rows: i64,
    ) -> bool {
        let applied = match self.get(id) {
            Some(record) => {
                let mut guard = write_record(&record);
                guard.update_table_data(schema, table, rows, total_rows)
            }
            None => false,
        };
        if !applied {
            tracing::debug!(connection_id = %id, schema, table, "row update skipped");
        }
        applied
    }
}
