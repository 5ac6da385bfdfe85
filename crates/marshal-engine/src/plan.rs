//! Interactive plan execution.
//!
//! Plans arrive from an external planner as an ordered list of described
//! steps. The executor runs them strictly in order under cooperative
//! pause/resume/abort control: both flags are checked only at step
//! boundaries, so a step that has started always finishes. Any step
//! failure halts the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use marshal_core::config::PlanConfig;
use marshal_core::types::Action;
use marshal_dispatch::Dispatcher;
use marshal_ledger::TaskKind;

use crate::error::PlanError;

// =============================================================================
// Plan types
// =============================================================================

/// Step lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl std::fmt::Display for PlanStepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStepStatus::Pending => write!(f, "pending"),
            PlanStepStatus::Running => write!(f, "running"),
            PlanStepStatus::Done => write!(f, "done"),
            PlanStepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Validate a step status transition.
///
/// Valid transitions:
/// - Pending -> Running
/// - Running -> Done
/// - Running -> Failed
pub fn validate_step_transition(
    from: PlanStepStatus,
    to: PlanStepStatus,
) -> Result<(), PlanError> {
    let valid = matches!(
        (from, to),
        (PlanStepStatus::Pending, PlanStepStatus::Running)
            | (PlanStepStatus::Running, PlanStepStatus::Done)
            | (PlanStepStatus::Running, PlanStepStatus::Failed)
    );

    if valid {
        Ok(())
    } else {
        Err(PlanError::InvalidTransition(from, to))
    }
}

/// One step of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: Uuid,
    pub description: String,
    pub action: Action,
    pub status: PlanStepStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// What the planner understood, could not resolve, and would ask.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanAnalysis {
    #[serde(default)]
    pub understood: Vec<String>,
    #[serde(default)]
    pub missing: Vec<String>,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// An executable plan. Produced externally; the executor only reads the
/// steps and mutates their statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    #[serde(default)]
    pub analysis: PlanAnalysis,
    pub steps: Vec<PlanStep>,
    pub ready: bool,
}

impl Plan {
    /// Set a step's status with transition validation.
    pub fn set_step_status(
        &mut self,
        index: usize,
        status: PlanStepStatus,
    ) -> Result<(), PlanError> {
        let step = self
            .steps
            .get_mut(index)
            .ok_or(PlanError::StepOutOfRange(index))?;
        validate_step_transition(step.status, status)?;
        step.status = status;
        Ok(())
    }

    /// Number of steps currently in the given status.
    pub fn count_in_status(&self, status: PlanStepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }
}

// =============================================================================
// Planner wire format
// =============================================================================

/// A step as emitted by the external planner. Ids are optional there;
/// ingestion assigns any that are missing.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedStep {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub description: String,
    pub plugin: String,
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Map<String, Value>,
}

/// The planner's output envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedPlan {
    pub goal: String,
    #[serde(default)]
    pub analysis: PlanAnalysis,
    pub steps: Vec<GeneratedStep>,
    #[serde(default)]
    pub ready: bool,
}

impl From<GeneratedPlan> for Plan {
    fn from(generated: GeneratedPlan) -> Self {
        let steps = generated
            .steps
            .into_iter()
            .map(|s| PlanStep {
                id: s.id.unwrap_or_else(Uuid::new_v4),
                description: s.description,
                action: Action {
                    plugin: s.plugin,
                    action: s.action,
                    params: s.params,
                },
                status: PlanStepStatus::Pending,
                result: None,
                error: None,
            })
            .collect();

        Plan {
            goal: generated.goal,
            analysis: generated.analysis,
            steps,
            ready: generated.ready,
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Cooperative run control, shared between the executor and the
/// operator surface. Checked only at step boundaries.
pub struct PlanController {
    paused: AtomicBool,
    aborted: AtomicBool,
}

impl PlanController {
    pub fn new() -> Self {
        Self {
            paused: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
        }
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Abort the run. Also clears the paused flag so an aborted run
    /// cannot stay stuck in the pause-poll loop.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

impl Default for PlanController {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Executor
// =============================================================================

/// What an execution run reports back.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExecutionOutcome {
    /// Steps that finished successfully.
    pub completed: usize,
    /// True when the run stopped before the last step finished, whether
    /// through a failure or an abort.
    pub halted_early: bool,
}

/// Runs one plan at a time against one device.
pub struct PlanExecutor {
    dispatcher: Arc<Dispatcher>,
    settle_delay: Duration,
    pause_poll: Duration,
}

impl PlanExecutor {
    pub fn new(dispatcher: Arc<Dispatcher>, config: &PlanConfig) -> Self {
        Self {
            dispatcher,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            pause_poll: Duration::from_millis(config.pause_poll_ms),
        }
    }

    /// Execute the plan's steps in order.
    ///
    /// Refuses plans whose `ready` flag is false. Pause and abort are
    /// honored between steps only; a failed step halts the run with
    /// every later step left `Pending`. After each successful step
    /// except the last, the executor waits the settle delay so the
    /// remote application can catch up.
    pub async fn execute(
        &self,
        device_id: &str,
        plan: Arc<Mutex<Plan>>,
        controller: Arc<PlanController>,
    ) -> Result<ExecutionOutcome, PlanError> {
        let total = {
            let guard = plan.lock().unwrap();
            if !guard.ready {
                return Err(PlanError::NotReady);
            }
            guard.steps.len()
        };

        tracing::info!(device = %device_id, steps = total, "Plan execution started");

        let mut completed = 0;
        let mut halted_early = false;

        for index in 0..total {
            if controller.is_aborted() {
                tracing::info!(step = index + 1, "Plan aborted before step");
                halted_early = true;
                break;
            }

            // Hold here while paused; abort releases the loop too.
            while controller.is_paused() {
                tokio::time::sleep(self.pause_poll).await;
            }

            if controller.is_aborted() {
                tracing::info!(step = index + 1, "Plan aborted before step");
                halted_early = true;
                break;
            }

            let (action, description) = {
                let mut guard = plan.lock().unwrap();
                guard.set_step_status(index, PlanStepStatus::Running)?;
                let step = &guard.steps[index];
                (step.action.clone(), step.description.clone())
            };

            let result = self
                .dispatcher
                .dispatch_as(device_id, &action, TaskKind::Single, Some(&description))
                .await;

            if result.success {
                {
                    let mut guard = plan.lock().unwrap();
                    guard.steps[index].result = result.data.clone();
                    guard.set_step_status(index, PlanStepStatus::Done)?;
                }
                completed += 1;

                if index + 1 < total {
                    tokio::time::sleep(self.settle_delay).await;
                }
            } else {
                let error = result
                    .failure
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "dispatch failed".to_string());
                tracing::warn!(step = index + 1, error = %error, "Plan step failed, halting run");

                let mut guard = plan.lock().unwrap();
                guard.steps[index].error = Some(error);
                guard.set_step_status(index, PlanStepStatus::Failed)?;
                halted_early = true;
                break;
            }
        }

        tracing::info!(completed, halted_early, "Plan execution finished");
        Ok(ExecutionOutcome {
            completed,
            halted_early,
        })
    }
}
