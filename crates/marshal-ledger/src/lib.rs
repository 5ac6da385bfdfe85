//! Append-only task ledger for Marshal.
//!
//! Every dispatched action, whatever the execution mode, lands here as
//! one immutable record. The ledger is the audit trail operators inspect
//! after the fact; it never rejects a write because the dispatch failed.

pub mod error;
pub mod record;
pub mod store;

pub use error::LedgerError;
pub use record::{TaskDraft, TaskKind, TaskRecord, TaskStatus};
pub use store::{TaskFilter, TaskLedger};
