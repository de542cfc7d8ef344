// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object store interface
//!
//! The persistence layer is an external collaborator: the engine only sees
//! this trait. It exposes a generic model-name surface for the expression
//! helpers and a typed surface for the runner itself, all within a single
//! transactional session per run.

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStore, StoreCall};

use async_trait::async_trait;
use nr_core::{
    Credential, Device, DeviceId, Pool, PoolId, ResultRecord, RunRecord, ServiceId,
    ServiceLogRecord, TaskId,
};
use serde_json::Value;
use thiserror::Error;

/// Filter map for generic queries (`field == value`).
pub type Filters = serde_json::Map<String, Value>;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{model} not found: {criteria}")]
    NotFound { model: String, criteria: String },
    #[error("commit failed: {0}")]
    Commit(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Transactional object store for runs, devices, pools, and results.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// First row of `model` matching every filter.
    async fn fetch(&self, model: &str, filters: &Filters) -> Result<Value, StoreError>;

    /// Every row of `model`.
    async fn fetch_all(&self, model: &str) -> Result<Vec<Value>, StoreError>;

    /// Create (or update, keyed by `name`) a row of `model`.
    async fn factory(&self, model: &str, fields: Filters) -> Result<Value, StoreError>;

    /// Delete the rows of `model` matching every filter.
    async fn delete(&self, model: &str, filters: &Filters) -> Result<(), StoreError>;

    /// Device whose `property` equals `value`, if any.
    async fn device_by(&self, property: &str, value: &Value) -> Result<Option<Device>, StoreError>;

    async fn pool(&self, id: &PoolId) -> Result<Pool, StoreError>;

    async fn all_pools(&self) -> Result<Vec<Pool>, StoreError>;

    /// Re-evaluate the pool's membership criteria and return the refreshed pool.
    async fn compute_pool(&self, id: &PoolId) -> Result<Pool, StoreError>;

    /// The main run row for a runtime.
    async fn run(&self, runtime: &str) -> Result<RunRecord, StoreError>;

    async fn update_run(&self, record: &RunRecord) -> Result<(), StoreError>;

    async fn set_task_active(&self, id: &TaskId, active: bool) -> Result<(), StoreError>;

    async fn set_service_status(&self, id: &ServiceId, status: &str) -> Result<(), StoreError>;

    async fn create_result(&self, record: &ResultRecord) -> Result<(), StoreError>;

    /// Result row for one device within a run tree.
    async fn result_for_device(
        &self,
        service: &ServiceId,
        parent_runtime: &str,
        device: &DeviceId,
    ) -> Result<Option<ResultRecord>, StoreError>;

    /// Most recent result for a service name within a run tree, optionally
    /// narrowed by device and workflow name.
    async fn result_by_service_name(
        &self,
        service_name: &str,
        parent_runtime: &str,
        device: Option<&str>,
        workflow: Option<&str>,
    ) -> Result<Option<ResultRecord>, StoreError>;

    async fn results(&self, parent_runtime: &str) -> Result<Vec<ResultRecord>, StoreError>;

    async fn create_service_log(&self, record: &ServiceLogRecord) -> Result<(), StoreError>;

    /// Credential applicable to a user (optionally scoped to a device and
    /// credential type). Secret fields are ciphertext.
    async fn credential(
        &self,
        user: &str,
        device: Option<&str>,
        credential_type: Option<&str>,
    ) -> Result<Credential, StoreError>;

    async fn commit(&self) -> Result<(), StoreError>;

    async fn rollback(&self) -> Result<(), StoreError>;
}
