// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device inventory records

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an inventory device.
    pub struct DeviceId;
}

/// Timestamp bookkeeping for a device, keyed by timestamp kind.
///
/// Each kind maps named instants (e.g. `status`, `runtime`) to their last
/// recorded value. The configuration snapshot layout mirrors this structure
/// into `timestamps.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceTimestamps {
    #[serde(default)]
    pub last_failure: IndexMap<String, String>,
    #[serde(default)]
    pub last_runtime: IndexMap<String, String>,
    #[serde(default)]
    pub last_update: IndexMap<String, String>,
    #[serde(default)]
    pub last_status: IndexMap<String, String>,
}

/// A network device targeted by service runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub ip_address: String,
    pub port: u16,
    /// Driver name for the CLI-automation transport family
    #[serde(default)]
    pub cli_driver: String,
    /// Driver name for the streaming-CLI transport family
    #[serde(default)]
    pub streaming_driver: String,
    /// Driver name for the vendor-agnostic management family
    #[serde(default)]
    pub agnostic_driver: String,
    /// Driver name for the NETCONF family
    #[serde(default)]
    pub netconf_driver: String,
    /// Configuration history, oldest first (timestamp -> text)
    #[serde(default)]
    pub configurations: IndexMap<String, String>,
    #[serde(default)]
    pub timestamps: DeviceTimestamps,
}

impl Device {
    /// Most recent stored configuration, if any.
    pub fn current_configuration(&self) -> Option<(&str, &str)> {
        self.configurations
            .last()
            .map(|(ts, text)| (ts.as_str(), text.as_str()))
    }

    /// Record a new configuration, dropping the oldest entries beyond `keep`.
    pub fn push_configuration(&mut self, timestamp: impl Into<String>, text: impl Into<String>, keep: usize) {
        self.configurations.insert(timestamp.into(), text.into());
        while self.configurations.len() > keep {
            self.configurations.shift_remove_index(0);
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Device {
    /// Minimal device for tests.
    pub fn test(name: &str) -> Self {
        Self {
            id: DeviceId::new(format!("dev-{name}")),
            name: name.to_string(),
            ip_address: "192.0.2.1".to_string(),
            port: 22,
            cli_driver: String::new(),
            streaming_driver: String::new(),
            agnostic_driver: String::new(),
            netconf_driver: String::new(),
            configurations: IndexMap::new(),
            timestamps: DeviceTimestamps::default(),
        }
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
