//! Route handler functions for all API endpoints.
//!
//! Each handler extracts parameters via axum extractors, drives the
//! engine components in AppState, and returns JSON responses.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use marshal_core::types::{Action, Device, DeviceStatus};
use marshal_dispatch::{DispatchFailure, DispatchResult};
use marshal_engine::{
    BatchSummary, ChainStep, ChainSummary, ExecutionOutcome, GeneratedPlan, JobSpec, Plan,
    PlanStep, ScheduledJob,
};
use marshal_ledger::{TaskFilter, TaskKind, TaskRecord, TaskStatus};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub devices: usize,
    pub tasks: usize,
}

#[derive(Debug, Deserialize)]
pub struct DeviceUpsertRequest {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct DeviceStatusRequest {
    pub status: DeviceStatus,
}

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub device_id: String,
    pub action: Action,
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub success: bool,
    pub data: Option<Value>,
    pub failure: Option<DispatchFailure>,
    pub duration_ms: u64,
    pub record_id: Option<Uuid>,
}

impl From<DispatchResult> for DispatchResponse {
    fn from(result: DispatchResult) -> Self {
        Self {
            success: result.success,
            data: result.data,
            failure: result.failure,
            duration_ms: result.duration_ms,
            record_id: result.record_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskQueryParams {
    pub device_id: Option<String>,
    pub status: Option<String>,
    pub kind: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ChainRequest {
    pub device_id: String,
    pub steps: Vec<ChainStep>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub device_id: String,
    pub actions: Vec<Action>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleToggleRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct PlanStartRequest {
    pub device_id: String,
    pub plan: GeneratedPlan,
}

#[derive(Debug, Serialize)]
pub struct PlanStartResponse {
    pub run_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PlanRunView {
    pub id: Uuid,
    pub device_id: String,
    pub goal: String,
    pub steps: Vec<PlanStep>,
    pub outcome: Option<ExecutionOutcome>,
}

#[derive(Debug, Serialize)]
pub struct PlanControlResponse {
    pub run_id: Uuid,
    pub state: String,
}

// =============================================================================
// Health
// =============================================================================

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        devices: state.directory.len(),
        tasks: state.ledger.len(),
    })
}

// =============================================================================
// Devices
// =============================================================================

pub async fn list_devices(State(state): State<AppState>) -> Json<Vec<Device>> {
    Json(state.directory.list())
}

pub async fn upsert_device(
    State(state): State<AppState>,
    Json(body): Json<DeviceUpsertRequest>,
) -> Result<Json<Device>, ApiError> {
    if body.id.trim().is_empty() || body.address.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Device id and address must not be empty".to_string(),
        ));
    }
    let device = state
        .directory
        .upsert(Device::new(body.id, body.name, body.address));
    Ok(Json(device))
}

pub async fn set_device_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<DeviceStatusRequest>,
) -> Result<Json<Device>, ApiError> {
    state
        .directory
        .set_status(&id, body.status)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No device with id {}", id)))
}

// =============================================================================
// Dispatch and tasks
// =============================================================================

pub async fn dispatch_action(
    State(state): State<AppState>,
    Json(body): Json<DispatchRequest>,
) -> Result<Json<DispatchResponse>, ApiError> {
    if !body.action.is_valid() {
        return Err(ApiError::BadRequest(
            "Action plugin and name must not be empty".to_string(),
        ));
    }
    let result = state.dispatcher.dispatch(&body.device_id, &body.action).await;
    Ok(Json(result.into()))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskQueryParams>,
) -> Result<Json<Vec<TaskRecord>>, ApiError> {
    let status = params
        .status
        .map(|s| s.parse::<TaskStatus>().map_err(ApiError::BadRequest))
        .transpose()?;
    let kind = params
        .kind
        .map(|k| k.parse::<TaskKind>().map_err(ApiError::BadRequest))
        .transpose()?;

    let filter = TaskFilter {
        device_id: params.device_id,
        status,
        kind,
        limit: params.limit,
    };
    Ok(Json(state.ledger.query(&filter)))
}

// =============================================================================
// Chains and batches
// =============================================================================

pub async fn run_chain(
    State(state): State<AppState>,
    Json(body): Json<ChainRequest>,
) -> Result<Json<ChainSummary>, ApiError> {
    if body.steps.is_empty() {
        return Err(ApiError::BadRequest("Chain has no steps".to_string()));
    }
    if body.steps.iter().any(|s| !s.action.is_valid()) {
        return Err(ApiError::BadRequest(
            "Every chain step needs a plugin and action name".to_string(),
        ));
    }
    let summary = state.chains.run(&body.device_id, &body.steps).await;
    Ok(Json(summary))
}

pub async fn run_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchRequest>,
) -> Result<Json<BatchSummary>, ApiError> {
    if body.actions.is_empty() {
        return Err(ApiError::BadRequest("Batch has no actions".to_string()));
    }
    if body.actions.iter().any(|a| !a.is_valid()) {
        return Err(ApiError::BadRequest(
            "Every batch action needs a plugin and action name".to_string(),
        ));
    }
    let summary = state.batches.run(&body.device_id, &body.actions).await;
    Ok(Json(summary))
}

// =============================================================================
// Schedules
// =============================================================================

pub async fn create_schedule(
    State(state): State<AppState>,
    Json(spec): Json<JobSpec>,
) -> Result<Json<ScheduledJob>, ApiError> {
    if !spec.action.is_valid() {
        return Err(ApiError::BadRequest(
            "Scheduled action needs a plugin and action name".to_string(),
        ));
    }
    let job = state.scheduler.register(spec)?;
    Ok(Json(job))
}

pub async fn list_schedules(State(state): State<AppState>) -> Json<Vec<ScheduledJob>> {
    Json(state.scheduler.list())
}

pub async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ScheduleToggleRequest>,
) -> Result<Json<ScheduledJob>, ApiError> {
    let job = state.scheduler.set_enabled(id, body.enabled)?;
    Ok(Json(job))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.scheduler.unregister(id)?;
    Ok(Json(serde_json::json!({"deleted": id})))
}

// =============================================================================
// Plan runs
// =============================================================================

pub async fn start_plan(
    State(state): State<AppState>,
    Json(body): Json<PlanStartRequest>,
) -> Result<Json<PlanStartResponse>, ApiError> {
    let plan: Plan = body.plan.into();
    let run = state.plans.start(body.device_id, plan)?;
    Ok(Json(PlanStartResponse { run_id: run.id }))
}

pub async fn get_plan_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanRunView>, ApiError> {
    let run = state
        .plans
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("No plan run with id {}", id)))?;

    let (goal, steps) = {
        let guard = run.plan.lock().unwrap();
        (guard.goal.clone(), guard.steps.clone())
    };
    let outcome = *run.outcome.lock().unwrap();

    Ok(Json(PlanRunView {
        id: run.id,
        device_id: run.device_id.clone(),
        goal,
        steps,
        outcome,
    }))
}

pub async fn pause_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanControlResponse>, ApiError> {
    if !state.plans.pause(id) {
        return Err(ApiError::NotFound(format!("No plan run with id {}", id)));
    }
    Ok(Json(PlanControlResponse {
        run_id: id,
        state: "paused".to_string(),
    }))
}

pub async fn resume_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanControlResponse>, ApiError> {
    if !state.plans.resume(id) {
        return Err(ApiError::NotFound(format!("No plan run with id {}", id)));
    }
    Ok(Json(PlanControlResponse {
        run_id: id,
        state: "running".to_string(),
    }))
}

pub async fn abort_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanControlResponse>, ApiError> {
    if !state.plans.abort(id) {
        return Err(ApiError::NotFound(format!("No plan run with id {}", id)));
    }
    Ok(Json(PlanControlResponse {
        run_id: id,
        state: "aborted".to_string(),
    }))
}
