// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result shapes produced by service jobs and persisted by the recorder

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value produced by a service body.
///
/// JSON shapes pass through persistence unchanged; `Opaque` carries the
/// display form of anything that has no JSON representation (a session
/// handle's debug string, raw bytes) and is stringified on the way out.
#[derive(Debug, Clone, PartialEq)]
pub enum JobValue {
    Json(Value),
    Opaque(String),
}

impl JobValue {
    /// Capture a non-JSON value by its debug representation.
    pub fn opaque(value: impl std::fmt::Debug) -> Self {
        JobValue::Opaque(format!("{value:?}"))
    }
}

impl From<Value> for JobValue {
    fn from(value: Value) -> Self {
        JobValue::Json(value)
    }
}

impl From<&str> for JobValue {
    fn from(value: &str) -> Self {
        JobValue::Json(Value::String(value.to_string()))
    }
}

impl From<String> for JobValue {
    fn from(value: String) -> Self {
        JobValue::Json(Value::String(value))
    }
}

impl From<bool> for JobValue {
    fn from(value: bool) -> Self {
        JobValue::Json(Value::Bool(value))
    }
}

impl From<i64> for JobValue {
    fn from(value: i64) -> Self {
        JobValue::Json(Value::Number(value.into()))
    }
}

/// What a service body returns: named values, insertion-ordered.
///
/// The conventional keys are `success` (defaulted to `true` downstream when
/// absent) and `result`.
pub type JobResult = IndexMap<String, JobValue>;

/// A fully normalized result map, safe to persist.
pub type ResultMap = serde_json::Map<String, Value>;

/// Reduce a job result to transport-safe JSON.
///
/// JSON values pass through untouched; opaque values become their string
/// form, with a log line per conversion. Applying this to an already-JSON
/// result is the identity.
pub fn to_json_compliant(results: JobResult) -> ResultMap {
    let mut out = ResultMap::new();
    for (key, value) in results {
        let json = match value {
            JobValue::Json(v) => v,
            JobValue::Opaque(text) => {
                tracing::info!(key = %key, "converting non-JSON value to string in results");
                Value::String(text)
            }
        };
        out.insert(key, json);
    }
    out
}

/// Build a `{success: false, result: ...}` map.
pub fn failure(result: impl Into<String>) -> ResultMap {
    let mut map = ResultMap::new();
    map.insert("success".to_string(), Value::Bool(false));
    map.insert("result".to_string(), Value::String(result.into()));
    map
}

/// Read the `success` flag of a result map, defaulting to `false` when the
/// key is absent or not a boolean.
pub fn is_success(results: &ResultMap) -> bool {
    results
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Per-run device outcome lists, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub success: Vec<String>,
    pub failure: Vec<String>,
}

impl Summary {
    /// Record a device name under the outcome key.
    pub fn record(&mut self, success: bool, device_name: impl Into<String>) {
        if success {
            self.success.push(device_name.into());
        } else {
            self.failure.push(device_name.into());
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({"success": self.success, "failure": self.failure})
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
