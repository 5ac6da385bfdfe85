//! Execution modes for Marshal.
//!
//! Everything here is built on top of the dispatcher: ordered chains with
//! per-step error policy and result threading, unordered batches,
//! interval-based recurring schedules, and interactively controllable
//! plan runs.

pub mod batch;
pub mod chain;
pub mod cron;
pub mod error;
pub mod plan;
pub mod scheduler;

pub use batch::{BatchItemOutcome, BatchRunner, BatchSummary};
pub use chain::{ChainRunner, ChainStep, ChainStepOutcome, ChainSummary, PREVIOUS_RESULT_KEY};
pub use error::{PlanError, ScheduleError};
pub use plan::{
    ExecutionOutcome, GeneratedPlan, GeneratedStep, Plan, PlanAnalysis, PlanController,
    PlanExecutor, PlanStep, PlanStepStatus,
};
pub use scheduler::{JobSpec, ScheduledJob, Scheduler};
