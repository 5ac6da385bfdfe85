//! Error types for the task ledger.

use marshal_core::error::MarshalError;
use uuid::Uuid;

/// Errors from ledger reads and writes.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Task record not found: {0}")]
    NotFound(Uuid),
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl From<LedgerError> for MarshalError {
    fn from(err: LedgerError) -> Self {
        MarshalError::Ledger(err.to_string())
    }
}
