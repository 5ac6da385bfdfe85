//! Shared foundation for the Marshal orchestration engine.
//!
//! Defines the core value types (actions, devices, timestamps), the TOML
//! configuration surface, and the top-level error type that subsystem
//! crates convert into.

pub mod config;
pub mod error;
pub mod types;

pub use config::MarshalConfig;
pub use error::{MarshalError, Result};
pub use types::{Action, Device, DeviceStatus, Timestamp};
