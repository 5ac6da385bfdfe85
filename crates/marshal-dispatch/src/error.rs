//! Error types for dispatch and transport.

use marshal_core::error::MarshalError;
use serde::{Deserialize, Serialize};

/// Transport-level failures: the agent could not be reached or did not
/// produce a parseable response. These are the only failures eligible for
/// the loopback fallback.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Request timed out after {0} ms")]
    Timeout(u64),
    #[error("Malformed agent response: {0}")]
    Malformed(String),
}

/// Why a dispatch did not succeed.
///
/// Carried as data inside `DispatchResult`, never thrown: a failed
/// dispatch still returns normally and still writes a task record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DispatchFailure {
    /// No device with this id in the directory.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    /// Device known but not online; no network call was attempted.
    #[error("Device offline: {0}")]
    DeviceOffline(String),
    /// Primary and fallback endpoints both unreachable.
    #[error("Agent unreachable: {0}")]
    NetworkUnreachable(String),
    /// The agent executed the action and reported logical failure.
    /// Never retried.
    #[error("Remote action failed: {0}")]
    RemoteApplicationError(String),
}

impl From<TransportError> for MarshalError {
    fn from(err: TransportError) -> Self {
        MarshalError::Agent(err.to_string())
    }
}
