//! Ordered multi-step chains.
//!
//! A chain is a one-shot ordered list of actions with a per-step
//! continue-on-error flag. A successful step's output threads into the
//! next step's parameters; a failing step either halts the chain or is
//! recorded and skipped past, depending on its flag.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use marshal_core::types::Action;
use marshal_dispatch::Dispatcher;
use marshal_ledger::TaskKind;

/// Reserved parameter key the previous step's output is injected under.
pub const PREVIOUS_RESULT_KEY: &str = "previousResult";

/// One step of a chain definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStep {
    pub action: Action,
    /// When true, a failure of this step is recorded and the chain
    /// continues; when false the chain halts here.
    #[serde(default)]
    pub continue_on_error: bool,
}

/// Outcome of one attempted step. Steps never attempted (after a halt)
/// have no outcome entry.
#[derive(Debug, Clone, Serialize)]
pub struct ChainStepOutcome {
    pub index: usize,
    pub action: String,
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

/// Aggregate result of one chain run.
///
/// The whole chain succeeded exactly when `failed == 0` and
/// `completed == total_steps`; an early halt leaves `completed` short.
#[derive(Debug, Clone, Serialize)]
pub struct ChainSummary {
    pub total_steps: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub step_results: Vec<ChainStepOutcome>,
}

/// Runs chains strictly in order, one step in flight at a time.
pub struct ChainRunner {
    dispatcher: Arc<Dispatcher>,
}

impl ChainRunner {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Execute the chain against one device.
    ///
    /// Step `i+1` starts only after step `i`'s dispatch has returned.
    /// The previous step's output is injected under
    /// [`PREVIOUS_RESULT_KEY`] only when that step succeeded.
    pub async fn run(&self, device_id: &str, steps: &[ChainStep]) -> ChainSummary {
        let total_steps = steps.len();
        let mut summary = ChainSummary {
            total_steps,
            completed: 0,
            succeeded: 0,
            failed: 0,
            step_results: Vec::new(),
        };

        let mut previous_output: Option<Value> = None;

        for (index, step) in steps.iter().enumerate() {
            let action = effective_action(&step.action, previous_output.as_ref());
            let name = format!(
                "{} (step {}/{})",
                step.action.label(),
                index + 1,
                total_steps
            );

            let result = self
                .dispatcher
                .dispatch_as(device_id, &action, TaskKind::Chain, Some(&name))
                .await;

            summary.completed += 1;

            if result.success {
                summary.succeeded += 1;
                previous_output = Some(result.data.clone().unwrap_or(Value::Null));
            } else {
                summary.failed += 1;
                previous_output = None;
            }

            let halt = !result.success && !step.continue_on_error;

            summary.step_results.push(ChainStepOutcome {
                index,
                action: step.action.label(),
                success: result.success,
                data: result.data,
                error: result.failure.map(|f| f.to_string()),
            });

            if halt {
                tracing::info!(
                    device = %device_id,
                    step = index + 1,
                    total = total_steps,
                    "Chain halted on step failure"
                );
                break;
            }
        }

        summary
    }
}

/// Build the action actually dispatched for a step: the defined action,
/// plus the previous step's output merged into the params when present.
fn effective_action(action: &Action, previous_output: Option<&Value>) -> Action {
    let mut effective = action.clone();
    if let Some(output) = previous_output {
        effective
            .params
            .insert(PREVIOUS_RESULT_KEY.to_string(), output.clone());
    }
    effective
}
