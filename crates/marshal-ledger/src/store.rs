//! The append-only ledger store.

use crate::error::LedgerError;
use crate::record::{TaskDraft, TaskKind, TaskRecord, TaskStatus};
use marshal_core::types::Timestamp;
use std::sync::Mutex;
use uuid::Uuid;

/// Filters for ledger queries. All fields are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub device_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub kind: Option<TaskKind>,
    pub limit: Option<usize>,
}

/// In-memory append-only store of task records.
///
/// Records are never mutated after insertion; a failed dispatch is a
/// `Failed` record, not a rejected write. Safe to share across tasks.
pub struct TaskLedger {
    records: Mutex<Vec<TaskRecord>>,
}

impl TaskLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Append one record, assigning its id and creation timestamp.
    pub fn append(&self, draft: TaskDraft) -> Result<TaskRecord, LedgerError> {
        let record = TaskRecord {
            id: Uuid::new_v4(),
            name: draft.name,
            kind: draft.kind,
            plugin: draft.plugin,
            action: draft.action,
            params_snapshot: draft.params_snapshot,
            status: draft.status,
            result: draft.result,
            error: draft.error,
            device_id: draft.device_id,
            created_at: Timestamp::now(),
        };

        let mut records = self
            .records
            .lock()
            .map_err(|e| LedgerError::Unavailable(format!("Lock poisoned: {}", e)))?;
        records.push(record.clone());
        Ok(record)
    }

    /// Get a record by id.
    pub fn get(&self, id: Uuid) -> Result<TaskRecord, LedgerError> {
        let records = self
            .records
            .lock()
            .map_err(|e| LedgerError::Unavailable(format!("Lock poisoned: {}", e)))?;
        records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))
    }

    /// List records matching the filter, newest first.
    pub fn query(&self, filter: &TaskFilter) -> Vec<TaskRecord> {
        let records = match self.records.lock() {
            Ok(r) => r,
            Err(_) => return vec![],
        };

        let mut result: Vec<TaskRecord> = records
            .iter()
            .filter(|r| {
                if let Some(ref device_id) = filter.device_id {
                    if &r.device_id != device_id {
                        return false;
                    }
                }
                if let Some(status) = filter.status {
                    if r.status != status {
                        return false;
                    }
                }
                if let Some(kind) = filter.kind {
                    if r.kind != kind {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        // Newest first; ties keep insertion order reversed deterministically.
        result.reverse();

        if let Some(limit) = filter.limit {
            result.truncate(limit);
        }

        result
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TaskLedger {
    fn default() -> Self {
        Self::new()
    }
}
