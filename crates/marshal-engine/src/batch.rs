//! Unordered batches of independent actions.
//!
//! Items share nothing: no ordering, no result threading, and one item's
//! failure never affects another. Items dispatch concurrently; results
//! come back in input order.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;

use marshal_core::types::Action;
use marshal_dispatch::Dispatcher;
use marshal_ledger::TaskKind;

/// Outcome of one batch item.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemOutcome {
    pub index: usize,
    pub action: String,
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

/// Aggregate result of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub item_results: Vec<BatchItemOutcome>,
}

/// Dispatches every item of a batch independently.
pub struct BatchRunner {
    dispatcher: Arc<Dispatcher>,
}

impl BatchRunner {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Dispatch all actions concurrently and collect every outcome
    /// before returning. `item_results` follows the input order.
    pub async fn run(&self, device_id: &str, actions: &[Action]) -> BatchSummary {
        let mut set = JoinSet::new();

        for (index, action) in actions.iter().enumerate() {
            let dispatcher = Arc::clone(&self.dispatcher);
            let device_id = device_id.to_string();
            let action = action.clone();
            set.spawn(async move {
                let result = dispatcher
                    .dispatch_as(&device_id, &action, TaskKind::Batch, None)
                    .await;
                BatchItemOutcome {
                    index,
                    action: action.label(),
                    success: result.success,
                    data: result.data,
                    error: result.failure.map(|f| f.to_string()),
                }
            });
        }

        let mut slots: Vec<Option<BatchItemOutcome>> = Vec::new();
        slots.resize_with(actions.len(), || None);

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => {
                    let index = outcome.index;
                    slots[index] = Some(outcome);
                }
                Err(e) => tracing::warn!(error = %e, "Batch item task failed to join"),
            }
        }

        let item_results: Vec<BatchItemOutcome> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| BatchItemOutcome {
                    index,
                    action: actions[index].label(),
                    success: false,
                    data: None,
                    error: Some("item task aborted before completing".to_string()),
                })
            })
            .collect();

        let succeeded = item_results.iter().filter(|r| r.success).count();
        let failed = item_results.len() - succeeded;

        BatchSummary {
            total: actions.len(),
            succeeded,
            failed,
            item_results,
        }
    }
}
