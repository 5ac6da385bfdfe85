//! REST surface for the Marshal operator console.
//!
//! Localhost-only axum server exposing dispatch, the task ledger,
//! devices, chains, batches, schedules, and interactive plan runs.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::{create_router, start_server};
pub use state::AppState;
