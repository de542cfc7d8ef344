// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-state tree: progress counters and status flags, keyed by
//! `<parent_runtime>/state/<runner path>/<subkey>`
//!
//! Two back-ends with identical semantics: an in-process nested tree for
//! single-node deployments, and an external KV service for cluster-shared
//! state. Counter writes never lose increments; scalar writes are
//! last-writer-wins.

use crate::kv::{KvError, KvStore};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Kv(#[from] KvError),
    #[error("increment with non-integer value at {0}")]
    InvalidIncrement(String),
    #[error("append to non-list at {0}")]
    AppendToScalar(String),
}

/// How a write mutates the addressed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMethod {
    /// Replace the value
    Set,
    /// Push onto the list at the key, creating it if absent
    Append,
    /// Add an integer delta, creating the key at 0 if absent
    Increment,
}

enum Backend {
    Memory(Mutex<Map<String, Value>>),
    Kv(Arc<dyn KvStore>),
}

/// Key-addressed tree of run progress and status.
pub struct StateStore {
    backend: Backend,
}

impl StateStore {
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(Map::new())),
        }
    }

    pub fn with_kv(kv: Arc<dyn KvStore>) -> Self {
        Self {
            backend: Backend::Kv(kv),
        }
    }

    fn segments(parent_runtime: &str, runner_path: &str, subpath: &str) -> Vec<String> {
        let mut parts = vec![
            parent_runtime.to_string(),
            "state".to_string(),
            runner_path.to_string(),
        ];
        parts.extend(subpath.split('/').filter(|s| !s.is_empty()).map(String::from));
        parts
    }

    /// Write a value under `<parent_runtime>/state/<runner_path>/<subpath>`.
    pub async fn write(
        &self,
        parent_runtime: &str,
        runner_path: &str,
        subpath: &str,
        value: Value,
        method: WriteMethod,
    ) -> Result<(), StateError> {
        let segments = Self::segments(parent_runtime, runner_path, subpath);
        match &self.backend {
            Backend::Memory(root) => {
                let mut root = root.lock();
                write_memory(&mut root, &segments, value, method)
            }
            Backend::Kv(kv) => {
                let key = segments.join("/");
                match method {
                    WriteMethod::Set => kv.set(&key, kv_string(&value)).await?,
                    WriteMethod::Append => kv.lpush(&key, kv_string(&value)).await?,
                    WriteMethod::Increment => {
                        let delta = value
                            .as_i64()
                            .ok_or_else(|| StateError::InvalidIncrement(key.clone()))?;
                        kv.incr(&key, delta).await?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Read the subtree (or scalar) at the addressed key.
    pub async fn read(
        &self,
        parent_runtime: &str,
        runner_path: &str,
        subpath: &str,
    ) -> Result<Option<Value>, StateError> {
        let segments = Self::segments(parent_runtime, runner_path, subpath);
        match &self.backend {
            Backend::Memory(root) => {
                let root = root.lock();
                let mut node = root.get(&segments[0]);
                for segment in &segments[1..] {
                    node = match node {
                        Some(value) => value.get(segment),
                        None => return Ok(None),
                    };
                }
                Ok(node.cloned())
            }
            Backend::Kv(kv) => {
                let key = segments.join("/");
                read_kv(kv.as_ref(), &key).await
            }
        }
    }

    /// Mark a runner path as initialized. Returns `false` when the path was
    /// already present (in-memory back-end only; the KV back-end always
    /// reports fresh).
    pub async fn init_path(
        &self,
        parent_runtime: &str,
        runner_path: &str,
    ) -> Result<bool, StateError> {
        match &self.backend {
            Backend::Memory(root) => {
                let mut root = root.lock();
                let state = ensure_object(&mut root, parent_runtime);
                let tree = ensure_object(state, "state");
                if tree.contains_key(runner_path) {
                    return Ok(false);
                }
                tree.insert(runner_path.to_string(), Value::Object(Map::new()));
                Ok(true)
            }
            Backend::Kv(_) => Ok(true),
        }
    }

    /// Full state tree for a run, keyed by runner path.
    pub async fn snapshot(&self, parent_runtime: &str) -> Result<Value, StateError> {
        match &self.backend {
            Backend::Memory(root) => Ok(root
                .lock()
                .get(parent_runtime)
                .and_then(|v| v.get("state"))
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()))),
            Backend::Kv(kv) => {
                let prefix = format!("{parent_runtime}/state/");
                let keys = kv.keys(&format!("{prefix}*")).await?;
                let mut tree = Map::new();
                for key in keys {
                    let Some(rest) = key.strip_prefix(&prefix) else {
                        continue;
                    };
                    if let Some(value) = read_kv(kv.as_ref(), &key).await? {
                        insert_nested(&mut tree, rest, value);
                    }
                }
                Ok(Value::Object(tree))
            }
        }
    }

    /// Drop every key belonging to a run.
    pub async fn clear(&self, parent_runtime: &str) -> Result<(), StateError> {
        match &self.backend {
            Backend::Memory(root) => {
                root.lock().remove(parent_runtime);
                Ok(())
            }
            Backend::Kv(kv) => {
                let keys = kv.keys(&format!("{parent_runtime}/*")).await?;
                if !keys.is_empty() {
                    kv.delete(&keys).await?;
                }
                Ok(())
            }
        }
    }
}

/// Booleans cross the KV wire as strings; everything else as its JSON or
/// plain-text form.
fn kv_string(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_kv_scalar(text: &str) -> Value {
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = text.parse::<i64>() {
                Value::Number(n.into())
            } else {
                Value::String(text.to_string())
            }
        }
    }
}

async fn read_kv(kv: &dyn KvStore, key: &str) -> Result<Option<Value>, StateError> {
    if let Some(items) = kv.lrange(key).await? {
        // lpush prepends, so reverse to recover arrival order
        let values = items.iter().rev().map(|s| parse_kv_scalar(s)).collect();
        return Ok(Some(Value::Array(values)));
    }
    match kv.get(key).await? {
        Some(text) => Ok(Some(parse_kv_scalar(&text))),
        None => {
            // No scalar here; the key may be an interior node
            let children = kv.keys(&format!("{key}/*")).await?;
            if children.is_empty() {
                return Ok(None);
            }
            let mut tree = Map::new();
            let prefix = format!("{key}/");
            for child in children {
                let Some(rest) = child.strip_prefix(&prefix) else {
                    continue;
                };
                if let Some(value) = leaf_kv(kv, &child).await? {
                    insert_nested(&mut tree, rest, value);
                }
            }
            Ok(Some(Value::Object(tree)))
        }
    }
}

/// Read a single leaf without recursing into interior nodes.
async fn leaf_kv(kv: &dyn KvStore, key: &str) -> Result<Option<Value>, StateError> {
    if let Some(items) = kv.lrange(key).await? {
        let values = items.iter().rev().map(|s| parse_kv_scalar(s)).collect();
        return Ok(Some(Value::Array(values)));
    }
    Ok(kv.get(key).await?.map(|text| parse_kv_scalar(&text)))
}

fn insert_nested(tree: &mut Map<String, Value>, flat_path: &str, value: Value) {
    let mut parts = flat_path.split('/').peekable();
    let mut current = tree;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return;
        }
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry.as_object_mut() {
            Some(map) => current = map,
            None => return,
        }
    }
}

fn ensure_object<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry.as_object_mut() {
        Some(map) => map,
        // ensured above
        None => unreachable!(),
    }
}

fn write_memory(
    root: &mut Map<String, Value>,
    segments: &[String],
    value: Value,
    method: WriteMethod,
) -> Result<(), StateError> {
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return Ok(()),
    };
    let mut current = root;
    for segment in parents {
        current = ensure_object(current, segment);
    }
    match method {
        WriteMethod::Set => {
            current.insert(last.clone(), value);
        }
        WriteMethod::Increment => {
            let key = segments.join("/");
            let delta = value
                .as_i64()
                .ok_or_else(|| StateError::InvalidIncrement(key.clone()))?;
            let entry = current
                .entry(last.clone())
                .or_insert_with(|| Value::Number(0.into()));
            let previous = entry.as_i64().unwrap_or(0);
            *entry = Value::Number((previous + delta).into());
        }
        WriteMethod::Append => {
            let entry = current
                .entry(last.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            match entry {
                Value::Array(items) => items.push(value),
                _ => return Err(StateError::AppendToScalar(segments.join("/"))),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
