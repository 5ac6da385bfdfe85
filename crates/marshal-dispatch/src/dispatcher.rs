//! The action dispatcher.
//!
//! One `dispatch` call is one remote invocation of an action against a
//! specific device, including the loopback fallback, and produces exactly
//! one task record whatever the outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use uuid::Uuid;

use marshal_core::config::AgentConfig;
use marshal_core::types::Action;
use marshal_ledger::{TaskDraft, TaskKind, TaskLedger, TaskStatus};

use crate::directory::DeviceDirectory;
use crate::error::{DispatchFailure, TransportError};
use crate::protocol::{AgentResponse, ExecuteRequest};
use crate::transport::AgentTransport;

/// Normalized outcome of one dispatch. Failure is data: callers inspect
/// `success`/`failure` instead of catching errors.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub success: bool,
    pub data: Option<Value>,
    pub failure: Option<DispatchFailure>,
    pub duration_ms: u64,
    /// Id of the ledger record written for this call, when the write
    /// itself succeeded.
    pub record_id: Option<Uuid>,
}

/// Dispatches actions to host-control agents and records every outcome.
pub struct Dispatcher {
    directory: Arc<DeviceDirectory>,
    transport: Arc<dyn AgentTransport>,
    ledger: Arc<TaskLedger>,
    timeout: Duration,
    loopback_fallback: bool,
}

impl Dispatcher {
    pub fn new(
        directory: Arc<DeviceDirectory>,
        transport: Arc<dyn AgentTransport>,
        ledger: Arc<TaskLedger>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            directory,
            transport,
            ledger,
            timeout: Duration::from_secs(config.timeout_secs),
            loopback_fallback: config.loopback_fallback,
        }
    }

    /// Dispatch a standalone action (`kind=single`).
    pub async fn dispatch(&self, device_id: &str, action: &Action) -> DispatchResult {
        self.dispatch_as(device_id, action, TaskKind::Single, None).await
    }

    /// Dispatch on behalf of a chain, batch, or scheduled run.
    ///
    /// Preconditions are checked in order: the device must exist and must
    /// be online, otherwise no network call is attempted. A transport
    /// failure retries exactly once against 127.0.0.1 within the same
    /// overall timeout budget; an application-level failure from the
    /// agent is passed through unchanged and never retried.
    pub async fn dispatch_as(
        &self,
        device_id: &str,
        action: &Action,
        kind: TaskKind,
        name: Option<&str>,
    ) -> DispatchResult {
        let started = Instant::now();
        let record_name = name.map(str::to_string).unwrap_or_else(|| action.label());

        let device = match self.directory.get(device_id) {
            Some(d) => d,
            None => {
                let failure = DispatchFailure::DeviceNotFound(device_id.to_string());
                return self.complete_failed(device_id, action, kind, record_name, failure, started);
            }
        };

        if !device.is_online() {
            let failure = DispatchFailure::DeviceOffline(device_id.to_string());
            return self.complete_failed(device_id, action, kind, record_name, failure, started);
        }

        let request = ExecuteRequest::from(action);
        match self.invoke_with_fallback(&device.address, &request, started).await {
            Ok(response) if response.success => {
                let duration_ms = started.elapsed().as_millis() as u64;
                let record_id = self.write_record(
                    device_id,
                    action,
                    kind,
                    record_name,
                    TaskStatus::Success,
                    response.data.as_ref().map(|v| v.to_string()),
                    None,
                );
                tracing::debug!(device = %device_id, action = %action.label(), duration_ms, "Dispatch succeeded");
                DispatchResult {
                    success: true,
                    data: response.data,
                    failure: None,
                    duration_ms,
                    record_id,
                }
            }
            Ok(response) => {
                let message = response
                    .error
                    .unwrap_or_else(|| "agent reported failure without detail".to_string());
                let failure = DispatchFailure::RemoteApplicationError(message);
                self.complete_failed(device_id, action, kind, record_name, failure, started)
            }
            Err(e) => {
                let failure = DispatchFailure::NetworkUnreachable(e.to_string());
                self.complete_failed(device_id, action, kind, record_name, failure, started)
            }
        }
    }

    /// Invoke the primary endpoint, then the loopback fallback when the
    /// failure was at the transport level. Both attempts share the one
    /// timeout budget that started with the dispatch.
    async fn invoke_with_fallback(
        &self,
        address: &str,
        request: &ExecuteRequest,
        started: Instant,
    ) -> Result<AgentResponse, TransportError> {
        let primary_err = match self.transport.invoke(address, request, self.timeout).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        let already_local = address == "127.0.0.1" || address == "localhost";
        if !self.loopback_fallback || already_local {
            return Err(primary_err);
        }

        let remaining = self.timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(primary_err);
        }

        tracing::debug!(address = %address, error = %primary_err, "Primary endpoint failed, retrying via loopback");
        self.transport
            .invoke("127.0.0.1", request, remaining)
            .await
            .map_err(|fallback_err| {
                TransportError::Connection(format!(
                    "primary ({}): {}; loopback: {}",
                    address, primary_err, fallback_err
                ))
            })
    }

    fn complete_failed(
        &self,
        device_id: &str,
        action: &Action,
        kind: TaskKind,
        record_name: String,
        failure: DispatchFailure,
        started: Instant,
    ) -> DispatchResult {
        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::warn!(device = %device_id, action = %action.label(), error = %failure, "Dispatch failed");
        let record_id = self.write_record(
            device_id,
            action,
            kind,
            record_name,
            TaskStatus::Failed,
            None,
            Some(failure.to_string()),
        );
        DispatchResult {
            success: false,
            data: None,
            failure: Some(failure),
            duration_ms,
            record_id,
        }
    }

    fn write_record(
        &self,
        device_id: &str,
        action: &Action,
        kind: TaskKind,
        name: String,
        status: TaskStatus,
        result: Option<String>,
        error: Option<String>,
    ) -> Option<Uuid> {
        let params_snapshot =
            serde_json::to_string(&action.params).unwrap_or_else(|_| "{}".to_string());
        let draft = TaskDraft {
            name,
            kind,
            plugin: action.plugin.clone(),
            action: action.action.clone(),
            params_snapshot,
            status,
            result,
            error,
            device_id: device_id.to_string(),
        };
        match self.ledger.append(draft) {
            Ok(record) => Some(record.id),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to write task record");
                None
            }
        }
    }
}
