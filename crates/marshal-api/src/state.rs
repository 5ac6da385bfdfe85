//! Application state shared across all route handlers.
//!
//! AppState wires the directory, ledger, dispatcher, and execution modes
//! together and is passed to handlers via axum's State extractor. All
//! fields use `Arc` for cheap cloning across handler tasks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use uuid::Uuid;

use marshal_core::config::MarshalConfig;
use marshal_dispatch::{AgentTransport, DeviceDirectory, Dispatcher};
use marshal_engine::{
    BatchRunner, ChainRunner, ExecutionOutcome, Plan, PlanController, PlanError, PlanExecutor,
    Scheduler,
};
use marshal_ledger::TaskLedger;

/// One interactive plan run owned by the console.
#[derive(Clone)]
pub struct PlanRun {
    pub id: Uuid,
    pub device_id: String,
    pub plan: Arc<Mutex<Plan>>,
    pub controller: Arc<PlanController>,
    pub outcome: Arc<Mutex<Option<ExecutionOutcome>>>,
}

/// Registry of plan runs started through the API.
///
/// Runs stay listed after completion so the operator can inspect final
/// step states and the outcome.
pub struct PlanRuns {
    executor: Arc<PlanExecutor>,
    runs: Mutex<HashMap<Uuid, PlanRun>>,
}

impl PlanRuns {
    pub fn new(executor: Arc<PlanExecutor>) -> Self {
        Self {
            executor,
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Start executing a plan in the background and register the run.
    ///
    /// Plans whose `ready` flag is false are rejected here, before any
    /// task is spawned.
    pub fn start(&self, device_id: String, plan: Plan) -> Result<PlanRun, PlanError> {
        if !plan.ready {
            return Err(PlanError::NotReady);
        }

        let run = PlanRun {
            id: Uuid::new_v4(),
            device_id: device_id.clone(),
            plan: Arc::new(Mutex::new(plan)),
            controller: Arc::new(PlanController::new()),
            outcome: Arc::new(Mutex::new(None)),
        };

        let executor = Arc::clone(&self.executor);
        let plan_handle = Arc::clone(&run.plan);
        let controller = Arc::clone(&run.controller);
        let outcome_slot = Arc::clone(&run.outcome);
        let run_id = run.id;

        tokio::spawn(async move {
            match executor.execute(&device_id, plan_handle, controller).await {
                Ok(outcome) => {
                    *outcome_slot.lock().unwrap() = Some(outcome);
                }
                Err(e) => {
                    tracing::warn!(run = %run_id, error = %e, "Plan run failed to execute");
                }
            }
        });

        self.runs.lock().unwrap().insert(run.id, run.clone());
        tracing::info!(run = %run.id, "Plan run started");
        Ok(run)
    }

    pub fn get(&self, id: Uuid) -> Option<PlanRun> {
        self.runs.lock().unwrap().get(&id).cloned()
    }

    pub fn pause(&self, id: Uuid) -> bool {
        match self.get(id) {
            Some(run) => {
                run.controller.pause();
                true
            }
            None => false,
        }
    }

    pub fn resume(&self, id: Uuid) -> bool {
        match self.get(id) {
            Some(run) => {
                run.controller.resume();
                true
            }
            None => false,
        }
    }

    pub fn abort(&self, id: Uuid) -> bool {
        match self.get(id) {
            Some(run) => {
                run.controller.abort();
                true
            }
            None => false,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Mutex<MarshalConfig>>,
    pub directory: Arc<DeviceDirectory>,
    pub ledger: Arc<TaskLedger>,
    pub dispatcher: Arc<Dispatcher>,
    pub chains: Arc<ChainRunner>,
    pub batches: Arc<BatchRunner>,
    pub scheduler: Arc<Scheduler>,
    pub plans: Arc<PlanRuns>,
    pub start_time: Instant,
}

impl AppState {
    /// Build the full component graph from a config and a transport.
    pub fn new(config: MarshalConfig, transport: Arc<dyn AgentTransport>) -> Self {
        let directory = Arc::new(DeviceDirectory::new());
        let ledger = Arc::new(TaskLedger::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&directory),
            transport,
            Arc::clone(&ledger),
            &config.agent,
        ));
        let chains = Arc::new(ChainRunner::new(Arc::clone(&dispatcher)));
        let batches = Arc::new(BatchRunner::new(Arc::clone(&dispatcher)));
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&dispatcher),
            Arc::clone(&directory),
        ));
        let executor = Arc::new(PlanExecutor::new(Arc::clone(&dispatcher), &config.plan));
        let plans = Arc::new(PlanRuns::new(executor));

        Self {
            config: Arc::new(Mutex::new(config)),
            directory,
            ledger,
            dispatcher,
            chains,
            batches,
            scheduler,
            plans,
            start_time: Instant::now(),
        }
    }
}
