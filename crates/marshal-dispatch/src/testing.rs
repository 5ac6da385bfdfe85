//! Scripted transport for tests.
//!
//! Enabled via the `testing` feature so downstream crates can drive the
//! dispatcher without a live agent. Responses pop in FIFO order; every
//! invocation is recorded with the address it targeted.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::protocol::{AgentResponse, ExecuteRequest};
use crate::transport::AgentTransport;

/// One recorded transport invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub address: String,
    pub request: ExecuteRequest,
}

/// Transport that replays a scripted sequence of outcomes.
///
/// When the script runs dry, further invocations return a generic
/// success with no data.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<AgentResponse, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    probe_result: Mutex<bool>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            probe_result: Mutex::new(true),
        }
    }

    /// Queue a successful response carrying `data`.
    pub fn push_success(&self, data: serde_json::Value) {
        self.script.lock().unwrap().push_back(Ok(AgentResponse {
            success: true,
            data: Some(data),
            error: None,
            duration_ms: Some(1),
        }));
    }

    /// Queue an application-level failure reported by the agent.
    pub fn push_remote_error(&self, message: &str) {
        self.script.lock().unwrap().push_back(Ok(AgentResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
            duration_ms: Some(1),
        }));
    }

    /// Queue a connectivity failure.
    pub fn push_connection_error(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Connection(message.to_string())));
    }

    pub fn set_probe_result(&self, healthy: bool) {
        *self.probe_result.lock().unwrap() = healthy;
    }

    /// All invocations so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentTransport for ScriptedTransport {
    async fn invoke(
        &self,
        address: &str,
        request: &ExecuteRequest,
        _timeout: Duration,
    ) -> Result<AgentResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            address: address.to_string(),
            request: request.clone(),
        });

        self.script.lock().unwrap().pop_front().unwrap_or(Ok(AgentResponse {
            success: true,
            data: None,
            error: None,
            duration_ms: Some(1),
        }))
    }

    async fn probe(&self, _address: &str, _timeout: Duration) -> bool {
        *self.probe_result.lock().unwrap()
    }
}
