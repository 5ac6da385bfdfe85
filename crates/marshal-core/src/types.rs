use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Enums
// =============================================================================

/// Reachability of a managed device, as last observed by the probe loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// Agent answered the last health probe.
    Online,
    /// Agent did not answer the last health probe.
    Offline,
    /// Never probed (freshly registered).
    Unknown,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Online => write!(f, "online"),
            DeviceStatus::Offline => write!(f, "offline"),
            DeviceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for DeviceStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(DeviceStatus::Online),
            "offline" => Ok(DeviceStatus::Offline),
            "unknown" => Ok(DeviceStatus::Unknown),
            _ => Err(format!("Unknown device status: {}", s)),
        }
    }
}

// =============================================================================
// Domain structs
// =============================================================================

/// A command descriptor sent to a remote host-control agent.
///
/// `plugin` names a capability on the agent (e.g. "window-control"),
/// `action` an operation within it (e.g. "list"), and `params` an
/// arbitrary JSON payload the agent interprets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub plugin: String,
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl Action {
    /// Create an action with an empty parameter payload.
    pub fn new(plugin: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            action: action.into(),
            params: serde_json::Map::new(),
        }
    }

    /// Builder-style parameter insertion.
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// True when both plugin and action name are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.plugin.trim().is_empty() && !self.action.trim().is_empty()
    }

    /// Canonical "plugin.action" label used for task record names.
    pub fn label(&self) -> String {
        format!("{}.{}", self.plugin, self.action)
    }
}

/// A managed device running a host-control agent.
///
/// Not owned by the engine: the directory holds these and the engine only
/// reads them to decide reachability before a dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Operator-assigned identifier (stable across restarts).
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Network address of the agent host (hostname or IP, no port).
    pub address: String,
    pub status: DeviceStatus,
}

impl Device {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            status: DeviceStatus::Unknown,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == DeviceStatus::Online
    }
}

// =============================================================================
// Newtype wrappers
// =============================================================================

/// Unix timestamp in seconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- DeviceStatus ----

    #[test]
    fn test_device_status_display() {
        assert_eq!(DeviceStatus::Online.to_string(), "online");
        assert_eq!(DeviceStatus::Offline.to_string(), "offline");
        assert_eq!(DeviceStatus::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_device_status_from_str() {
        assert_eq!("online".parse::<DeviceStatus>().unwrap(), DeviceStatus::Online);
        assert_eq!("offline".parse::<DeviceStatus>().unwrap(), DeviceStatus::Offline);
        assert_eq!("unknown".parse::<DeviceStatus>().unwrap(), DeviceStatus::Unknown);
        assert!("bogus".parse::<DeviceStatus>().is_err());
    }

    #[test]
    fn test_device_status_serde_round_trip() {
        for variant in [DeviceStatus::Online, DeviceStatus::Offline, DeviceStatus::Unknown] {
            let json = serde_json::to_string(&variant).unwrap();
            let rt: DeviceStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(variant, rt);
        }
    }

    #[test]
    fn test_device_status_from_str_error_message() {
        let err = "bogus".parse::<DeviceStatus>().unwrap_err();
        assert_eq!(err, "Unknown device status: bogus");
    }

    // ---- Action ----

    #[test]
    fn test_action_new_has_empty_params() {
        let action = Action::new("window-control", "list");
        assert_eq!(action.plugin, "window-control");
        assert_eq!(action.action, "list");
        assert!(action.params.is_empty());
    }

    #[test]
    fn test_action_with_param() {
        let action = Action::new("window-control", "focus")
            .with_param("title", serde_json::json!("Terminal"))
            .with_param("index", serde_json::json!(2));
        assert_eq!(action.params.len(), 2);
        assert_eq!(action.params["title"], "Terminal");
        assert_eq!(action.params["index"], 2);
    }

    #[test]
    fn test_action_validity() {
        assert!(Action::new("media", "play").is_valid());
        assert!(!Action::new("", "play").is_valid());
        assert!(!Action::new("media", "  ").is_valid());
    }

    #[test]
    fn test_action_label() {
        assert_eq!(Action::new("media", "play").label(), "media.play");
    }

    #[test]
    fn test_action_serde_round_trip() {
        let action = Action::new("input", "type").with_param("text", serde_json::json!("hi"));
        let json = serde_json::to_string(&action).unwrap();
        let rt: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(action, rt);
    }

    #[test]
    fn test_action_deserialize_without_params() {
        let action: Action =
            serde_json::from_str(r#"{"plugin":"media","action":"pause"}"#).unwrap();
        assert!(action.params.is_empty());
    }

    // ---- Device ----

    #[test]
    fn test_device_new_starts_unknown() {
        let device = Device::new("d1", "Workstation", "192.168.1.20");
        assert_eq!(device.status, DeviceStatus::Unknown);
        assert!(!device.is_online());
    }

    #[test]
    fn test_device_is_online() {
        let mut device = Device::new("d1", "Workstation", "192.168.1.20");
        device.status = DeviceStatus::Online;
        assert!(device.is_online());
        device.status = DeviceStatus::Offline;
        assert!(!device.is_online());
    }

    // ---- Timestamp ----

    #[test]
    fn test_timestamp_ordering() {
        assert!(Timestamp(100) < Timestamp(200));
        assert_eq!(Timestamp(100), Timestamp(100));
    }

    #[test]
    fn test_timestamp_datetime_round_trip() {
        let ts = Timestamp(1700000000);
        let rt = Timestamp::from_datetime(ts.to_datetime());
        assert_eq!(ts, rt);
    }

    #[test]
    fn test_timestamp_now_is_recent() {
        let now = Timestamp::now();
        assert!(now.0 > 1700000000);
    }
}
