//! Task record types and their supporting enumerations.

use marshal_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Which execution mode produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Single,
    Batch,
    Chain,
    Scheduled,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Single => write!(f, "single"),
            TaskKind::Batch => write!(f, "batch"),
            TaskKind::Chain => write!(f, "chain"),
            TaskKind::Scheduled => write!(f, "scheduled"),
        }
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(TaskKind::Single),
            "batch" => Ok(TaskKind::Batch),
            "chain" => Ok(TaskKind::Chain),
            "scheduled" => Ok(TaskKind::Scheduled),
            _ => Err(format!("Unknown task kind: {}", s)),
        }
    }
}

/// Lifecycle status of a record.
///
/// Records for completed remote calls are born directly in a terminal
/// state; `Pending`/`Running` exist for callers that record before the
/// call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "success" => Ok(TaskStatus::Success),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// One immutable dispatch outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub name: String,
    pub kind: TaskKind,
    pub plugin: String,
    pub action: String,
    /// The parameter payload as sent, serialized for inspection.
    pub params_snapshot: String,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub device_id: String,
    pub created_at: Timestamp,
}

/// Everything a caller supplies for one record; the ledger assigns the
/// id and creation timestamp.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub name: String,
    pub kind: TaskKind,
    pub plugin: String,
    pub action: String,
    pub params_snapshot: String,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub device_id: String,
}
