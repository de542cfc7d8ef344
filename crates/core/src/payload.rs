// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The mutable payload shared across a run tree
//!
//! Shape: `{form?: {...}, variables: {<name>: value, devices: {<device>:
//! {<name>: value}}}}`. Parallel per-device workers write into their own
//! device subtree; global writes are last-writer-wins.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload editor: {name} not found in {scope}")]
    Missing { name: String, scope: String },
    #[error("payload editor: {0} is not a list")]
    NotAList(String),
}

/// Cheaply clonable handle to the run tree's shared payload.
#[derive(Clone, Default)]
pub struct Payload {
    inner: Arc<Mutex<Value>>,
}

impl Payload {
    pub fn new(initial: Value) -> Self {
        let value = if initial.is_object() {
            initial
        } else {
            Value::Object(Map::new())
        };
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }

    /// Value from the parameterized-run form, if present.
    pub fn form_value(&self, name: &str) -> Option<Value> {
        self.inner
            .lock()
            .get("form")
            .and_then(|form| form.get(name))
            .cloned()
    }

    /// Clone of the global variable map (including the `devices` subtree).
    pub fn variables(&self) -> Map<String, Value> {
        self.inner
            .lock()
            .get("variables")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Clone of one device's variable map.
    pub fn device_variables(&self, device: &str) -> Map<String, Value> {
        self.inner
            .lock()
            .get("variables")
            .and_then(|v| v.get("devices"))
            .and_then(|v| v.get(device))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Set a variable, optionally device- and section-scoped.
    pub fn set(&self, name: &str, value: Value, device: Option<&str>, section: Option<&str>) {
        let mut guard = self.inner.lock();
        let target = scoped_map(&mut guard, device, section);
        target.insert(name.to_string(), value);
    }

    /// Append to an existing list variable.
    pub fn append(
        &self,
        name: &str,
        value: Value,
        device: Option<&str>,
        section: Option<&str>,
    ) -> Result<(), PayloadError> {
        let mut guard = self.inner.lock();
        let target = scoped_map(&mut guard, device, section);
        match target.get_mut(name) {
            Some(Value::Array(items)) => {
                items.push(value);
                Ok(())
            }
            Some(_) => Err(PayloadError::NotAList(name.to_string())),
            None => Err(PayloadError::Missing {
                name: name.to_string(),
                scope: scope_label(device, section),
            }),
        }
    }

    /// Read a variable. A missing name without `allow_none` is an error;
    /// `default` substitutes before that check.
    pub fn get(
        &self,
        name: &str,
        device: Option<&str>,
        section: Option<&str>,
        default: Option<Value>,
        allow_none: bool,
    ) -> Result<Option<Value>, PayloadError> {
        let mut guard = self.inner.lock();
        let target = scoped_map(&mut guard, device, section);
        let found = target.get(name).cloned().or(default);
        if found.is_none() && !allow_none {
            return Err(PayloadError::Missing {
                name: name.to_string(),
                scope: scope_label(device, section),
            });
        }
        Ok(found)
    }

    /// Full deep copy of the payload.
    pub fn snapshot(&self) -> Value {
        self.inner.lock().clone()
    }

    /// Merge another payload object's keys into this one (top level).
    pub fn merge(&self, other: &Value) {
        if let Some(map) = other.as_object() {
            let mut guard = self.inner.lock();
            if let Some(target) = guard.as_object_mut() {
                for (key, value) in map {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

fn scope_label(device: Option<&str>, section: Option<&str>) -> String {
    match (device, section) {
        (Some(d), Some(s)) => format!("variables.devices.{d}.{s}"),
        (Some(d), None) => format!("variables.devices.{d}"),
        (None, Some(s)) => format!("variables.{s}"),
        (None, None) => "variables".to_string(),
    }
}

/// Walk to the scoped variable map, materializing intermediate objects.
fn scoped_map<'a>(
    payload: &'a mut Value,
    device: Option<&str>,
    section: Option<&str>,
) -> &'a mut Map<String, Value> {
    let mut keys: Vec<String> = vec!["variables".to_string()];
    if let Some(device) = device {
        keys.push("devices".to_string());
        keys.push(device.to_string());
    }
    if let Some(section) = section {
        keys.push(section.to_string());
    }
    let mut current = payload;
    for key in keys {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(key)
                .or_insert_with(|| Value::Object(Map::new())),
            // forced to an object just above
            _ => unreachable!(),
        };
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => map,
        // forced to an object just above
        _ => unreachable!(),
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
