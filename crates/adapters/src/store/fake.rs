// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake object store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Filters, ObjectStore, StoreError};
use async_trait::async_trait;
use nr_core::{
    Credential, Device, DeviceId, Pool, PoolId, ResultRecord, RunRecord, ServiceId,
    ServiceLogRecord, TaskId,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded store call
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Fetch { model: String },
    FetchAll { model: String },
    Factory { model: String },
    Delete { model: String },
    ComputePool { id: String },
    SetTaskActive { id: String, active: bool },
    SetServiceStatus { id: String, status: String },
    Commit,
    Rollback,
}

#[derive(Default)]
struct FakeStoreState {
    devices: Vec<Device>,
    pools: HashMap<String, Pool>,
    computed_devices: HashMap<String, Vec<Device>>,
    runs: HashMap<String, RunRecord>,
    results: Vec<ResultRecord>,
    service_logs: Vec<ServiceLogRecord>,
    service_status: HashMap<String, String>,
    task_active: HashMap<String, bool>,
    credentials: HashMap<String, Credential>,
    rows: HashMap<String, Vec<Value>>,
    calls: Vec<StoreCall>,
    fail_commits: u32,
}

/// In-memory object store for tests. Records every mutating call and can be
/// told to fail upcoming commits.
#[derive(Clone, Default)]
pub struct FakeStore {
    inner: Arc<Mutex<FakeStoreState>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&self, device: Device) {
        self.inner.lock().devices.push(device);
    }

    pub fn add_pool(&self, pool: Pool) {
        self.inner.lock().pools.insert(pool.id.to_string(), pool);
    }

    /// Devices the pool will contain after `compute_pool` refreshes it.
    pub fn set_computed_devices(&self, pool: &PoolId, devices: Vec<Device>) {
        self.inner
            .lock()
            .computed_devices
            .insert(pool.to_string(), devices);
    }

    pub fn add_run(&self, record: RunRecord) {
        self.inner.lock().runs.insert(record.runtime.clone(), record);
    }

    pub fn add_credential(&self, user: &str, credential: Credential) {
        self.inner
            .lock()
            .credentials
            .insert(user.to_string(), credential);
    }

    pub fn add_row(&self, model: &str, row: Value) {
        self.inner.lock().rows.entry(model.to_string()).or_default().push(row);
    }

    /// Fail the next `n` commits with a backend error.
    pub fn fail_next_commits(&self, n: u32) {
        self.inner.lock().fail_commits = n;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().calls.clone()
    }

    pub fn commit_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, StoreCall::Commit))
            .count()
    }

    pub fn rollback_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, StoreCall::Rollback))
            .count()
    }

    pub fn saved_results(&self) -> Vec<ResultRecord> {
        self.inner.lock().results.clone()
    }

    pub fn saved_service_logs(&self) -> Vec<ServiceLogRecord> {
        self.inner.lock().service_logs.clone()
    }

    pub fn saved_run(&self, runtime: &str) -> Option<RunRecord> {
        self.inner.lock().runs.get(runtime).cloned()
    }

    pub fn service_status(&self, id: &ServiceId) -> Option<String> {
        self.inner.lock().service_status.get(id.as_str()).cloned()
    }

    pub fn task_active(&self, id: &TaskId) -> Option<bool> {
        self.inner.lock().task_active.get(id.as_str()).copied()
    }

    pub fn rows(&self, model: &str) -> Vec<Value> {
        self.inner.lock().rows.get(model).cloned().unwrap_or_default()
    }
}

fn matches_filters(row: &Value, filters: &Filters) -> bool {
    filters.iter().all(|(key, value)| row.get(key) == Some(value))
}

fn device_property(device: &Device, property: &str) -> Value {
    match property {
        "id" => Value::String(device.id.to_string()),
        "name" => Value::String(device.name.clone()),
        "ip_address" => Value::String(device.ip_address.clone()),
        "port" => Value::Number(device.port.into()),
        _ => Value::Null,
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn fetch(&self, model: &str, filters: &Filters) -> Result<Value, StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::Fetch {
            model: model.to_string(),
        });
        inner
            .rows
            .get(model)
            .and_then(|rows| rows.iter().find(|row| matches_filters(row, filters)))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                model: model.to_string(),
                criteria: Value::Object(filters.clone()).to_string(),
            })
    }

    async fn fetch_all(&self, model: &str) -> Result<Vec<Value>, StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::FetchAll {
            model: model.to_string(),
        });
        Ok(inner.rows.get(model).cloned().unwrap_or_default())
    }

    async fn factory(&self, model: &str, fields: Filters) -> Result<Value, StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::Factory {
            model: model.to_string(),
        });
        let row = Value::Object(fields);
        inner.rows.entry(model.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn delete(&self, model: &str, filters: &Filters) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::Delete {
            model: model.to_string(),
        });
        if let Some(rows) = inner.rows.get_mut(model) {
            rows.retain(|row| !matches_filters(row, filters));
        }
        Ok(())
    }

    async fn device_by(&self, property: &str, value: &Value) -> Result<Option<Device>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .devices
            .iter()
            .find(|d| &device_property(d, property) == value)
            .cloned())
    }

    async fn pool(&self, id: &PoolId) -> Result<Pool, StoreError> {
        self.inner
            .lock()
            .pools
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                model: "pool".to_string(),
                criteria: id.to_string(),
            })
    }

    async fn all_pools(&self) -> Result<Vec<Pool>, StoreError> {
        Ok(self.inner.lock().pools.values().cloned().collect())
    }

    async fn compute_pool(&self, id: &PoolId) -> Result<Pool, StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::ComputePool { id: id.to_string() });
        let refreshed = inner.computed_devices.get(id.as_str()).cloned();
        let pool = inner
            .pools
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotFound {
                model: "pool".to_string(),
                criteria: id.to_string(),
            })?;
        if let Some(devices) = refreshed {
            pool.devices = devices;
        }
        Ok(pool.clone())
    }

    async fn run(&self, runtime: &str) -> Result<RunRecord, StoreError> {
        self.inner
            .lock()
            .runs
            .get(runtime)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                model: "run".to_string(),
                criteria: runtime.to_string(),
            })
    }

    async fn update_run(&self, record: &RunRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .runs
            .insert(record.runtime.clone(), record.clone());
        Ok(())
    }

    async fn set_task_active(&self, id: &TaskId, active: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::SetTaskActive {
            id: id.to_string(),
            active,
        });
        inner.task_active.insert(id.to_string(), active);
        Ok(())
    }

    async fn set_service_status(&self, id: &ServiceId, status: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::SetServiceStatus {
            id: id.to_string(),
            status: status.to_string(),
        });
        inner
            .service_status
            .insert(id.to_string(), status.to_string());
        Ok(())
    }

    async fn create_result(&self, record: &ResultRecord) -> Result<(), StoreError> {
        self.inner.lock().results.push(record.clone());
        Ok(())
    }

    async fn result_for_device(
        &self,
        service: &ServiceId,
        parent_runtime: &str,
        device: &DeviceId,
    ) -> Result<Option<ResultRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .results
            .iter()
            .rev()
            .find(|r| {
                &r.service == service
                    && r.parent_runtime == parent_runtime
                    && r.device.as_ref() == Some(device)
            })
            .cloned())
    }

    async fn result_by_service_name(
        &self,
        service_name: &str,
        parent_runtime: &str,
        device: Option<&str>,
        _workflow: Option<&str>,
    ) -> Result<Option<ResultRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .results
            .iter()
            .rev()
            .find(|r| {
                r.service_name == service_name
                    && r.parent_runtime == parent_runtime
                    && device.map_or(true, |d| r.device_name.as_deref() == Some(d))
            })
            .cloned())
    }

    async fn results(&self, parent_runtime: &str) -> Result<Vec<ResultRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .results
            .iter()
            .filter(|r| r.parent_runtime == parent_runtime)
            .cloned()
            .collect())
    }

    async fn create_service_log(&self, record: &ServiceLogRecord) -> Result<(), StoreError> {
        self.inner.lock().service_logs.push(record.clone());
        Ok(())
    }

    async fn credential(
        &self,
        user: &str,
        _device: Option<&str>,
        _credential_type: Option<&str>,
    ) -> Result<Credential, StoreError> {
        self.inner
            .lock()
            .credentials
            .get(user)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                model: "credential".to_string(),
                criteria: user.to_string(),
            })
    }

    async fn commit(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::Commit);
        if inner.fail_commits > 0 {
            inner.fail_commits -= 1;
            return Err(StoreError::Commit("injected commit failure".to_string()));
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), StoreError> {
        self.inner.lock().calls.push(StoreCall::Rollback);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
