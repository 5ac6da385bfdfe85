//! In-memory device directory.
//!
//! Owns the set of managed devices and their last observed reachability.
//! The engine reads it before every dispatch; the probe loop updates it.

use marshal_core::types::{Device, DeviceStatus};
use std::collections::HashMap;
use std::sync::Mutex;

/// Registry of managed devices keyed by operator-assigned id.
pub struct DeviceDirectory {
    devices: Mutex<HashMap<String, Device>>,
}

impl DeviceDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Insert or replace a device, keyed by its id.
    pub fn upsert(&self, device: Device) -> Device {
        let mut devices = self.devices.lock().unwrap();
        devices.insert(device.id.clone(), device.clone());
        device
    }

    /// Look up a device by id.
    pub fn get(&self, id: &str) -> Option<Device> {
        let devices = self.devices.lock().unwrap();
        devices.get(id).cloned()
    }

    /// Update a device's reachability. Returns the updated device, or
    /// `None` if no device with this id exists.
    pub fn set_status(&self, id: &str, status: DeviceStatus) -> Option<Device> {
        let mut devices = self.devices.lock().unwrap();
        devices.get_mut(id).map(|d| {
            d.status = status;
            d.clone()
        })
    }

    /// Remove a device. Returns `true` if it existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut devices = self.devices.lock().unwrap();
        devices.remove(id).is_some()
    }

    /// List all devices, sorted by id for stable output.
    pub fn list(&self) -> Vec<Device> {
        let devices = self.devices.lock().unwrap();
        let mut result: Vec<Device> = devices.values().cloned().collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        result
    }

    pub fn len(&self) -> usize {
        self.devices.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DeviceDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_get() {
        let directory = DeviceDirectory::new();
        directory.upsert(Device::new("d1", "Workstation", "192.168.1.20"));

        let found = directory.get("d1").unwrap();
        assert_eq!(found.name, "Workstation");
        assert_eq!(found.status, DeviceStatus::Unknown);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let directory = DeviceDirectory::new();
        assert!(directory.get("d9").is_none());
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let directory = DeviceDirectory::new();
        directory.upsert(Device::new("d1", "Old", "192.168.1.20"));
        directory.upsert(Device::new("d1", "New", "192.168.1.21"));

        assert_eq!(directory.len(), 1);
        let found = directory.get("d1").unwrap();
        assert_eq!(found.name, "New");
        assert_eq!(found.address, "192.168.1.21");
    }

    #[test]
    fn test_set_status() {
        let directory = DeviceDirectory::new();
        directory.upsert(Device::new("d1", "Workstation", "192.168.1.20"));

        let updated = directory.set_status("d1", DeviceStatus::Online).unwrap();
        assert_eq!(updated.status, DeviceStatus::Online);
        assert!(directory.get("d1").unwrap().is_online());
    }

    #[test]
    fn test_set_status_missing_returns_none() {
        let directory = DeviceDirectory::new();
        assert!(directory.set_status("d9", DeviceStatus::Online).is_none());
    }

    #[test]
    fn test_remove() {
        let directory = DeviceDirectory::new();
        directory.upsert(Device::new("d1", "Workstation", "192.168.1.20"));
        assert!(directory.remove("d1"));
        assert!(!directory.remove("d1"));
        assert!(directory.is_empty());
    }

    #[test]
    fn test_list_sorted_by_id() {
        let directory = DeviceDirectory::new();
        directory.upsert(Device::new("d2", "B", "10.0.0.2"));
        directory.upsert(Device::new("d1", "A", "10.0.0.1"));
        directory.upsert(Device::new("d3", "C", "10.0.0.3"));

        let ids: Vec<String> = directory.list().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["d1", "d2", "d3"]);
    }
}
