// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk configuration snapshot layout
//!
//! `<root>/<device>/` holds the latest configuration text (named after the
//! device) and `timestamps.json`, which maps each timestamp kind to its
//! named instants. Backup-flavored jobs call this after refreshing a
//! device's configuration history.

use crate::error::EngineError;
use nr_core::Device;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// Writer for the per-device configuration snapshot directory, rooted at
/// `<cwd>/git/configurations` in production.
pub struct ConfigurationSnapshot {
    root: PathBuf,
}

impl ConfigurationSnapshot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Conventional root under the current working directory.
    pub fn default_root() -> Result<Self, EngineError> {
        let cwd = std::env::current_dir()
            .map_err(|e| EngineError::Configuration(format!("cannot resolve cwd: {e}")))?;
        Ok(Self::new(cwd.join("git").join("configurations")))
    }

    pub fn device_dir(&self, device: &Device) -> PathBuf {
        self.root.join(&device.name)
    }

    /// Write the device's latest configuration and merge its timestamps
    /// into `timestamps.json`.
    pub async fn write_device(&self, device: &Device) -> Result<PathBuf, EngineError> {
        let dir = self.device_dir(device);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        if let Some((_, configuration)) = device.current_configuration() {
            let config_path = dir.join(&device.name);
            tokio::fs::write(&config_path, configuration)
                .await
                .map_err(|e| io_error(&config_path, e))?;
        }
        let timestamps_path = dir.join("timestamps.json");
        let mut data = read_timestamps(&timestamps_path).await;
        for (property, instants) in [
            ("last_failure", &device.timestamps.last_failure),
            ("last_runtime", &device.timestamps.last_runtime),
            ("last_update", &device.timestamps.last_update),
            ("last_status", &device.timestamps.last_status),
        ] {
            data.insert(property.to_string(), json!(instants));
        }
        let text = serde_json::to_string_pretty(&Value::Object(data))
            .map_err(|e| EngineError::Configuration(e.to_string()))?;
        tokio::fs::write(&timestamps_path, text)
            .await
            .map_err(|e| io_error(&timestamps_path, e))?;
        Ok(dir)
    }
}

fn io_error(path: &Path, e: std::io::Error) -> EngineError {
    EngineError::Configuration(format!("snapshot write failed at {}: {e}", path.display()))
}

async fn read_timestamps(path: &Path) -> Map<String, Value> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default(),
        Err(_) => Map::new(),
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
