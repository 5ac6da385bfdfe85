//! Marshal console binary - composition root.
//!
//! Ties the crates together into a single executable:
//! 1. Load configuration from TOML
//! 2. Build the component graph (directory, ledger, dispatcher, runners)
//! 3. Seed devices and recurring schedules from config
//! 4. Start the device probe loop
//! 5. Start the axum REST API server

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use marshal_api::{routes, AppState};
use marshal_core::config::MarshalConfig;
use marshal_core::types::{Action, Device, DeviceStatus};
use marshal_dispatch::{AgentTransport, DeviceDirectory, HttpAgentTransport};
use marshal_engine::JobSpec;

mod cli;

/// Per-device health probe timeout. Probes are cheap and frequent, so
/// they give up well before the dispatch timeout would.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Periodically probe every registered device and record whether its
/// agent answered.
async fn device_probe_loop(
    directory: Arc<DeviceDirectory>,
    transport: Arc<dyn AgentTransport>,
    interval_secs: u64,
) {
    tracing::info!(interval_secs, "Device probe loop started");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        interval.tick().await;

        for device in directory.list() {
            let healthy = transport.probe(&device.address, PROBE_TIMEOUT).await;
            let status = if healthy {
                DeviceStatus::Online
            } else {
                DeviceStatus::Offline
            };
            if device.status != status {
                tracing::info!(device = %device.id, status = %status, "Device status changed");
                directory.set_status(&device.id, status);
            }
        }
    }
}

/// Seed directory entries and recurring jobs from the loaded config.
fn seed_from_config(state: &AppState, config: &MarshalConfig) {
    for entry in &config.devices {
        state.directory.upsert(Device::new(
            entry.id.clone(),
            entry.name.clone(),
            entry.address.clone(),
        ));
        tracing::info!(device = %entry.id, address = %entry.address, "Device registered from config");
    }

    for entry in &config.schedules {
        let spec = JobSpec {
            name: entry.name.clone(),
            schedule: entry.schedule.clone(),
            device_id: entry.device_id.clone(),
            action: Action {
                plugin: entry.plugin.clone(),
                action: entry.action.clone(),
                params: entry.params.clone(),
            },
        };
        match state.scheduler.register(spec) {
            Ok(job) => {
                tracing::info!(job = %job.name, interval_ms = job.interval_ms, "Schedule registered from config")
            }
            Err(e) => {
                tracing::warn!(job = %entry.name, error = %e, "Skipping config schedule")
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();

    // Config first; its log level feeds tracing setup.
    let config_file = args.resolve_config_path();
    let config = MarshalConfig::load_or_default(&config_file);

    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Marshal v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Component graph around the real HTTP transport.
    let transport: Arc<dyn AgentTransport> =
        Arc::new(HttpAgentTransport::new(config.agent.port));
    let state = AppState::new(config.clone(), Arc::clone(&transport));

    seed_from_config(&state, &config);

    // Background device probe loop.
    let probe_directory = Arc::clone(&state.directory);
    let probe_transport = Arc::clone(&transport);
    let probe_interval = config.agent.probe_interval_secs.max(1);
    tokio::spawn(async move {
        device_probe_loop(probe_directory, probe_transport, probe_interval).await;
    });

    // API server.
    let port = args.resolve_port(config.general.port);
    tracing::info!(port, "Operator API starting");

    if let Err(e) = routes::start_server(port, state).await {
        tracing::error!(error = %e, "API server exited — is another instance running?");
        tracing::error!("Try: MARSHAL_PORT={} marshal", port + 1);
        return Err(e.into());
    }

    Ok(())
}
