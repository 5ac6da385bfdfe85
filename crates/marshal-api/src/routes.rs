//! Router setup with all API routes and middleware.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/devices", get(handlers::list_devices))
        .route("/api/devices", put(handlers::upsert_device))
        .route(
            "/api/devices/{id}/status",
            axum::routing::patch(handlers::set_device_status),
        )
        .route("/api/dispatch", post(handlers::dispatch_action))
        .route("/api/tasks", get(handlers::list_tasks))
        .route("/api/chains/run", post(handlers::run_chain))
        .route("/api/batches/run", post(handlers::run_batch))
        .route(
            "/api/schedules",
            get(handlers::list_schedules).post(handlers::create_schedule),
        )
        .route(
            "/api/schedules/{id}",
            axum::routing::patch(handlers::update_schedule).delete(handlers::delete_schedule),
        )
        .route("/api/plans", post(handlers::start_plan))
        .route("/api/plans/{id}", get(handlers::get_plan_run))
        .route("/api/plans/{id}/pause", post(handlers::pause_plan))
        .route("/api/plans/{id}/resume", post(handlers::resume_plan))
        .route("/api/plans/{id}/abort", post(handlers::abort_plan))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the configured port.
///
/// Binds to 127.0.0.1 only: the console is a local operator surface.
pub async fn start_server(
    port: u16,
    state: AppState,
) -> Result<(), marshal_core::error::MarshalError> {
    let addr = format!("127.0.0.1:{}", port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| marshal_core::error::MarshalError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| marshal_core::error::MarshalError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
