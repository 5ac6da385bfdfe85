use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MarshalError, Result};

/// Top-level configuration for the Marshal console.
///
/// Loaded from `~/.marshal/config.toml` by default. Each section covers a
/// subsystem; `[[devices]]` and `[[schedules]]` entries are seeded into
/// the directory and scheduler at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarshalConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub plan: PlanConfig,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
}

impl Default for MarshalConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            agent: AgentConfig::default(),
            plan: PlanConfig::default(),
            devices: Vec::new(),
            schedules: Vec::new(),
        }
    }
}

impl MarshalConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MarshalConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MarshalError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Port the operator API listens on (localhost only).
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            port: 7400,
        }
    }
}

/// Remote agent invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Fixed port every host-control agent listens on.
    pub port: u16,
    /// Overall timeout budget for one dispatch, both attempts included.
    pub timeout_secs: u64,
    /// Retry a failed connection once against 127.0.0.1 on the same port.
    pub loopback_fallback: bool,
    /// Seconds between device health probes.
    pub probe_interval_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            port: 7410,
            timeout_secs: 10,
            loopback_fallback: true,
            probe_interval_secs: 30,
        }
    }
}

/// Plan execution pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Wait between successful plan steps, giving the remote application
    /// time to process input before the next step lands.
    pub settle_delay_ms: u64,
    /// Poll interval while a run is paused.
    pub pause_poll_ms: u64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 750,
            pause_poll_ms: 200,
        }
    }
}

/// A device seeded into the directory at startup. Probing resolves its
/// actual reachability; entries start out `unknown`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub address: String,
}

/// A recurring job registered at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub name: String,
    /// Recurrence expression, restricted to the `*/N * * * *` form.
    pub schedule: String,
    pub device_id: String,
    pub plugin: String,
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}
