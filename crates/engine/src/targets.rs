// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target resolution: explicit devices, pools, and device queries

use crate::convert::value_to_text;
use crate::error::EngineError;
use crate::runner::Runner;
use nr_adapters::Scope;
use nr_core::{Device, PoolId};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

fn push_unique(out: &mut Vec<Device>, seen: &mut HashSet<String>, device: Device) {
    if seen.insert(device.id.to_string()) {
        out.push(device);
    }
}

impl Runner {
    /// Compute the effective device set: explicit targets, pool members
    /// (optionally recomputed), and device-query results, de-duplicated in
    /// that order, then filtered by the run's target ACL.
    pub(crate) async fn compute_devices(self: &Arc<Self>) -> Result<Vec<Device>, EngineError> {
        let store = &self.engine().deps.store;
        let mut out = Vec::new();
        let mut seen = HashSet::new();

        for device in &self.spawn_targets {
            push_unique(&mut out, &mut seen, device.clone());
        }

        if let Some(Value::Array(ids)) = self.param("target_devices") {
            for id in &ids {
                match store.device_by("id", id).await? {
                    Some(device) => push_unique(&mut out, &mut seen, device),
                    None => self.log(
                        "error",
                        &format!("Unknown target device: {}", value_to_text(id)),
                        None,
                        None,
                    ),
                }
            }
        }

        if let Some(Value::Array(pool_ids)) = self.param("target_pools") {
            for id in &pool_ids {
                let pool_id = PoolId::new(value_to_text(id));
                let pool = if self.def().update_target_pools {
                    store.compute_pool(&pool_id).await?
                } else {
                    store.pool(&pool_id).await?
                };
                for device in pool.devices {
                    push_unique(&mut out, &mut seen, device);
                }
            }
        }

        let query = self
            .param("device_query")
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        if !query.is_empty() {
            let property = self
                .param("device_query_property")
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_else(|| "ip_address".to_string());
            for device in self.devices_from_query(&query, &property, None).await? {
                push_unique(&mut out, &mut seen, device);
            }
        }

        let mut allowed = Vec::new();
        let mut removed = Vec::new();
        for device in out {
            if self
                .engine()
                .allowed_target(&self.parent_runtime, &device.id)
            {
                allowed.push(device);
            } else {
                removed.push(device.name.clone());
            }
        }
        if !removed.is_empty() {
            self.log(
                "info",
                &format!(
                    "Error 403: User '{}' is not allowed to use these devices as targets: {}",
                    self.creator,
                    removed.join(", ")
                ),
                None,
                Some("security"),
            );
        }
        Ok(allowed)
    }

    /// Evaluate a device query and resolve each value to a Device.
    ///
    /// Scalars are coerced to single-element lists; values that are already
    /// device-shaped are used directly, everything else is looked up by
    /// `property`. Unresolved values fail the resolution with one
    /// diagnostic listing them all.
    pub(crate) async fn devices_from_query(
        self: &Arc<Self>,
        query: &str,
        property: &str,
        device: Option<&Device>,
    ) -> Result<Vec<Device>, EngineError> {
        let store = &self.engine().deps.store;
        let values = self.eval(query, device, Scope::new()).await?;
        let values = match values {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            scalar => vec![scalar],
        };
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut not_found = Vec::new();
        for value in values {
            if let Ok(found) = serde_json::from_value::<Device>(value.clone()) {
                push_unique(&mut out, &mut seen, found);
                continue;
            }
            match store.device_by(property, &value).await? {
                Some(found) => push_unique(&mut out, &mut seen, found),
                None => not_found.push(value_to_text(&value)),
            }
        }
        if !not_found.is_empty() {
            return Err(EngineError::InvalidTargets(not_found.join(", ")));
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "targets_tests.rs"]
mod tests;
