// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted records exchanged with the object store

use crate::device::DeviceId;
use crate::service::ServiceId;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a persisted run row.
    pub struct RunId;
}

impl RunId {
    /// Fresh identifier for a run row created outside the object store
    /// (REST invocations, tests).
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

crate::define_id! {
    /// Unique identifier for a scheduled task.
    pub struct TaskId;
}

crate::define_id! {
    /// Unique identifier for a workflow.
    pub struct WorkflowId;
}

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Skipped,
    Completed,
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "Running"),
            RunStatus::Skipped => write!(f, "Skipped"),
            RunStatus::Completed => write!(f, "Completed"),
            RunStatus::Aborted => write!(f, "Aborted"),
        }
    }
}

/// How the parent workflow dispatches its member services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRunMethod {
    PerServiceWithWorkflowTargets,
    PerServiceWithServiceTargets,
    DeviceByDevice,
}

/// Non-owning reference to the workflow a runner executes under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRef {
    pub id: WorkflowId,
    pub name: String,
    pub run_method: WorkflowRunMethod,
}

/// A service reference substituted into a parameterized workflow slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderRef {
    pub id: ServiceId,
    pub scoped_name: String,
    pub service_type: String,
}

/// Reference to the scheduled task that triggered a run, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: TaskId,
    #[serde(default)]
    pub frequency: Option<u64>,
    #[serde(default)]
    pub crontab_expression: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

impl TaskRef {
    /// A task with no frequency and no calendar expression fires once.
    pub fn is_one_shot(&self) -> bool {
        self.frequency.is_none() && self.crontab_expression.is_none()
    }
}

/// Persisted row for the main run of a tree. One per `parent_runtime`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    pub runtime: String,
    pub service_id: ServiceId,
    pub creator: String,
    #[serde(default)]
    pub trigger: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// 0 disables service logging; 1..=5 selects the minimum severity
    #[serde(default = "default_log_level")]
    pub log_level: u8,
    #[serde(default)]
    pub placeholder: Option<PlaceholderRef>,
    #[serde(default)]
    pub task: Option<TaskRef>,
    /// Services that contributed to this run
    #[serde(default)]
    pub services: Vec<ServiceId>,
    pub status: RunStatus,
    #[serde(default)]
    pub duration: Option<String>,
    /// Snapshot of the state tree, captured at finalization
    #[serde(default)]
    pub state: serde_json::Value,
}

fn default_log_level() -> u8 {
    1
}

impl RunRecord {
    pub fn new(id: impl Into<RunId>, runtime: impl Into<String>, service_id: impl Into<ServiceId>, creator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            runtime: runtime.into(),
            service_id: service_id.into(),
            creator: creator.into(),
            trigger: "regular".to_string(),
            tags: Vec::new(),
            log_level: default_log_level(),
            placeholder: None,
            task: None,
            services: Vec::new(),
            status: RunStatus::Running,
            duration: None,
            state: serde_json::Value::Null,
        }
    }
}

/// Persisted row for one result (per device, per iteration target, or run level).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub run_id: RunId,
    pub service: ServiceId,
    /// Service name (and scoped name) at the time of the run, for lookups
    #[serde(default)]
    pub service_name: String,
    pub parent_service: ServiceId,
    pub parent_runtime: String,
    #[serde(default)]
    pub workflow: Option<WorkflowId>,
    #[serde(default)]
    pub parent_device: Option<DeviceId>,
    #[serde(default)]
    pub device: Option<DeviceId>,
    #[serde(default)]
    pub device_name: Option<String>,
    pub result: serde_json::Value,
    #[serde(default)]
    pub duration: String,
    pub success: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Accumulated log lines for one service within one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceLogRecord {
    pub runtime: String,
    pub service: ServiceId,
    pub content: String,
}

/// How a stored credential authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    #[default]
    Password,
    Key,
}

/// A stored credential. Secret fields hold ciphertext; plaintext only exists
/// in [`ResolvedCredential`] after going through the secret store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub subtype: CredentialKind,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub enable_password: String,
}

/// Decrypted credential material handed to a transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedCredential {
    pub username: String,
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub secret: Option<String>,
}
