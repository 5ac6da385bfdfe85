//! Error types for the execution modes.

use crate::plan::PlanStepStatus;
use marshal_core::error::MarshalError;
use uuid::Uuid;

/// Errors from schedule registration and registry mutation.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// The recurrence expression is not of the accepted `*/N * * * *`
    /// form. Rejected at registration, before any timer exists.
    #[error("Invalid recurrence expression: {0}")]
    InvalidSchedule(String),
    #[error("Scheduled job not found: {0}")]
    NotFound(Uuid),
}

/// Errors from plan execution.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The plan's `ready` flag is false; it must not be executed.
    #[error("Plan is not ready for execution")]
    NotReady,
    #[error("Invalid step transition: {0} -> {1}")]
    InvalidTransition(PlanStepStatus, PlanStepStatus),
    #[error("Plan step index out of range: {0}")]
    StepOutOfRange(usize),
}

impl From<ScheduleError> for MarshalError {
    fn from(err: ScheduleError) -> Self {
        MarshalError::Engine(err.to_string())
    }
}

impl From<PlanError> for MarshalError {
    fn from(err: PlanError) -> Self {
        MarshalError::Engine(err.to_string())
    }
}
