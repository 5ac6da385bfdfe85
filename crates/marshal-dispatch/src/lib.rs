//! Action dispatch for Marshal.
//!
//! Resolves a device, invokes its host-control agent over HTTP with a
//! loopback fallback, and records every outcome in the task ledger.
//! Higher execution modes (chains, batches, schedules, plans) all funnel
//! through the `Dispatcher` here.

pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod protocol;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use directory::DeviceDirectory;
pub use dispatcher::{DispatchResult, Dispatcher};
pub use error::{DispatchFailure, TransportError};
pub use protocol::{AgentResponse, ExecuteRequest};
pub use transport::{AgentTransport, HttpAgentTransport};
