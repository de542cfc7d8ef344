// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runner: one activation of one service

use crate::connections::ConnectionKey;
use crate::engine::{Engine, RunEntry};
use crate::error::EngineError;
use crate::job::Service;
use nr_adapters::{ConnectionSpec, DeviceSession, ProtocolFamily};
use nr_core::{
    format_duration, Device, Payload, ResolvedCredential, ResultMap, RunMethod, RunRecord,
    RunStatus, ServiceDefinition, WorkflowRef, WorkflowRunMethod,
};
use nr_state::WriteMethod;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Severities, least to most severe. The run's `log_level` selects the
/// first index that still gets logged.
const LOG_SEVERITIES: [&str; 5] = ["debug", "info", "warning", "error", "critical"];

fn severity_rank(severity: &str) -> usize {
    LOG_SEVERITIES
        .iter()
        .position(|s| *s == severity)
        .unwrap_or(1)
}

/// Everything needed to construct a runner.
///
/// Child runners (iteration, sub-services) inherit the payload and workflow
/// of their parent and carry explicitly computed targets.
pub struct RunnerSpawn {
    pub service: Arc<Service>,
    pub parent_runtime: String,
    pub is_main_run: bool,
    pub parent_path: Option<String>,
    pub iteration_run: bool,
    pub parent_device: Option<Device>,
    pub target_devices: Vec<Device>,
    pub payload: Payload,
    pub workflow: Option<WorkflowRef>,
    pub workflow_run_method: Option<WorkflowRunMethod>,
    /// Workflow-level skip decisions, keyed by workflow name
    pub skip: HashMap<String, bool>,
}

impl RunnerSpawn {
    /// Spawn for the root runner of a tree.
    pub fn main(service: Arc<Service>, parent_runtime: impl Into<String>) -> Self {
        Self {
            service,
            parent_runtime: parent_runtime.into(),
            is_main_run: true,
            parent_path: None,
            iteration_run: false,
            parent_device: None,
            target_devices: Vec::new(),
            payload: Payload::default(),
            workflow: None,
            workflow_run_method: None,
            skip: HashMap::new(),
        }
    }
}

/// One activation of one service. Ephemeral: registered in the engine for
/// its lifetime, removed on completion.
pub struct Runner {
    engine: Arc<Engine>,
    pub runtime: String,
    pub parent_runtime: String,
    pub path: String,
    pub is_main_run: bool,
    pub iteration_run: bool,
    progress_scope: &'static str,
    pub service: Arc<Service>,
    definition_json: Value,
    pub workflow: Option<WorkflowRef>,
    pub(crate) workflow_run_method: Option<WorkflowRunMethod>,
    pub parent_device: Option<Device>,
    pub payload: Payload,
    pub creator: String,
    main_run: Mutex<RunRecord>,
    targets: Mutex<Vec<Device>>,
    pub(crate) spawn_targets: Vec<Device>,
    pub(crate) skip: HashMap<String, bool>,
}

impl Runner {
    /// Construct a runner, execute it to completion, and return its results.
    // Boxed (rather than `async fn`) to break the async recursion through
    // device iteration, which calls back into `Runner::run`: the opaque
    // future type of a plain `async fn` here cannot be proven `Send` in the
    // presence of that cycle, but a named boxed future can.
    pub fn run(
        engine: Arc<Engine>,
        spawn: RunnerSpawn,
    ) -> Pin<Box<dyn Future<Output = Result<ResultMap, EngineError>> + Send>> {
        Box::pin(async move {
            let runner = Self::init(engine, spawn).await?;
            let results = runner.start_run().await;
            runner.engine.unregister_run(&runner.runtime);
            Ok(results)
        })
    }

    pub(crate) async fn init(engine: Arc<Engine>, spawn: RunnerSpawn) -> Result<Arc<Self>, EngineError> {
        let runtime = engine.issue_runtime();
        let mut main_run = engine.deps.store.run(&spawn.parent_runtime).await?;
        let service_id = spawn.service.definition.id.clone();
        let path = if spawn.is_main_run {
            service_id.to_string()
        } else {
            format!(
                "{}>{}",
                spawn.parent_path.clone().unwrap_or_default(),
                service_id
            )
        };
        if !main_run.services.contains(&service_id) {
            main_run.services.push(service_id.clone());
            engine.deps.store.update_run(&main_run).await?;
        }
        engine.deps.store.commit().await?;
        engine.register_run(
            &runtime,
            RunEntry {
                path: path.clone(),
                service_id,
            },
        );
        let definition_json = serde_json::to_value(&spawn.service.definition).unwrap_or(Value::Null);
        let creator = main_run.creator.clone();
        Ok(Arc::new(Self {
            engine,
            runtime,
            parent_runtime: spawn.parent_runtime,
            path,
            is_main_run: spawn.is_main_run,
            iteration_run: spawn.iteration_run,
            progress_scope: if spawn.iteration_run {
                "iteration_device"
            } else {
                "device"
            },
            service: spawn.service,
            definition_json,
            workflow: spawn.workflow,
            workflow_run_method: spawn.workflow_run_method,
            parent_device: spawn.parent_device,
            payload: spawn.payload,
            creator,
            main_run: Mutex::new(main_run),
            targets: Mutex::new(Vec::new()),
            spawn_targets: spawn.target_devices,
            skip: spawn.skip,
        }))
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub(crate) fn def(&self) -> &ServiceDefinition {
        &self.service.definition
    }

    /// The devices this runner is (currently) operating on.
    pub fn target_devices(&self) -> Vec<Device> {
        self.targets.lock().clone()
    }

    pub(crate) fn set_targets(&self, devices: Vec<Device>) {
        *self.targets.lock() = devices;
    }

    pub(crate) fn main_run(&self) -> RunRecord {
        self.main_run.lock().clone()
    }

    pub(crate) fn progress_key(&self) -> String {
        format!("progress/{}", self.progress_scope)
    }

    /// Run parameter lookup: the parameterized-run form wins, then the
    /// service definition when the workflow dispatches with service
    /// targets, then (for the main run) the definition itself. Sub-runners
    /// receive their parameters explicitly and resolve nothing here.
    pub fn param(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.payload.form_value(name) {
            return Some(value);
        }
        if self.workflow_run_method == Some(WorkflowRunMethod::PerServiceWithServiceTargets) {
            return self.definition_json.get(name).cloned();
        }
        if !self.is_main_run {
            return None;
        }
        self.definition_json.get(name).cloned()
    }

    pub(crate) async fn stop_requested(&self) -> bool {
        self.engine.stop_requested(&self.parent_runtime).await
    }

    pub(crate) async fn write_state(&self, subpath: &str, value: Value, method: WriteMethod) {
        if let Err(e) = self
            .engine
            .state()
            .write(&self.parent_runtime, &self.path, subpath, value, method)
            .await
        {
            tracing::error!(path = %self.path, subpath, error = %e, "state write failed");
        }
    }

    async fn init_state(&self) {
        match self
            .engine
            .state()
            .init_path(&self.parent_runtime, &self.path)
            .await
        {
            Ok(true) => {
                let placeholder = self.main_run.lock().placeholder.clone();
                if let Some(placeholder) = placeholder {
                    self.write_state(
                        "placeholder/id",
                        json!(placeholder.id.to_string()),
                        WriteMethod::Set,
                    )
                    .await;
                    self.write_state(
                        "placeholder/scoped_name",
                        json!(placeholder.scoped_name),
                        WriteMethod::Set,
                    )
                    .await;
                    self.write_state(
                        "placeholder/type",
                        json!(placeholder.service_type),
                        WriteMethod::Set,
                    )
                    .await;
                }
                self.write_state("success", json!(true), WriteMethod::Set)
                    .await;
            }
            Ok(false) => {}
            Err(e) => tracing::error!(path = %self.path, error = %e, "state init failed"),
        }
    }

    /// Log through tracing and into the run's service log queue.
    pub fn log(&self, severity: &str, message: &str, device: Option<&str>, logger: Option<&str>) {
        let log_level = self.main_run.lock().log_level as usize;
        if log_level == 0 || severity_rank(severity) + 1 < log_level {
            return;
        }
        let mut line = message.to_string();
        if let Some(device) = device {
            line = format!("DEVICE {device} - {line}");
        }
        let line = format!(
            "USER {} - SERVICE {} - {}",
            self.creator,
            self.def().scoped_name,
            line
        );
        let logger = logger.unwrap_or("run");
        match severity {
            "debug" => tracing::debug!(logger, "{line}"),
            "warning" => tracing::warn!(logger, "{line}"),
            "error" | "critical" => tracing::error!(logger, "{line}"),
            _ => tracing::info!(logger, "{line}"),
        }
        let stamp = nr_core::runtime_stamp(self.engine.deps.clock.epoch_ms(), 0);
        let entry = format!("{stamp} - {severity} - {line}");
        self.engine
            .queue_log(&self.parent_runtime, &self.def().id, entry.clone());
        if !self.is_main_run {
            let main_service = self.main_run.lock().service_id.clone();
            self.engine
                .queue_log(&self.parent_runtime, &main_service, entry);
        }
    }

    /// Execute the run: init state, fan out, then walk the finalization
    /// ladder (commit, pools, notification, counters, duration, main-run
    /// status, connection teardown, result row).
    pub(crate) async fn start_run(self: &Arc<Self>) -> ResultMap {
        let service_id = self.def().id.clone();
        let start_ms = self.engine.deps.clock.epoch_ms();
        self.init_state().await;
        self.write_state("status", json!("Running"), WriteMethod::Set)
            .await;

        let mut results = ResultMap::new();
        results.insert("runtime".to_string(), json!(self.runtime));
        results.insert("success".to_string(), json!(true));
        self.engine.service_started(&service_id);

        match self.device_run().await {
            Ok(map) => {
                for (key, value) in map {
                    results.insert(key, value);
                }
            }
            Err(e) => {
                let message = e.to_string();
                self.log("error", &message, None, None);
                results.insert("success".to_string(), json!(false));
                results.insert("result".to_string(), json!(message));
            }
        }

        let store = &self.engine.deps.store;
        if let Err(e) = store.commit().await {
            if let Err(rollback) = store.rollback().await {
                tracing::error!(error = %rollback, "rollback after failed commit also failed");
            }
            let message = e.to_string();
            self.log("error", &message, None, None);
            results.insert("success".to_string(), json!(false));
            results.insert("error".to_string(), json!(message));
        }

        if self.def().update_pools_after_running {
            match store.all_pools().await {
                Ok(pools) => {
                    for pool in pools {
                        if let Err(e) = store.compute_pool(&pool.id).await {
                            self.log("error", &format!("Pool update failed: {e}"), None, None);
                        }
                    }
                }
                Err(e) => self.log("error", &format!("Pool update failed: {e}"), None, None),
            }
        }

        if self.def().send_notification {
            match self.notify(&results).await {
                Ok(outcome) => {
                    results.insert("notification".to_string(), outcome);
                }
                Err(e) => {
                    self.log("error", &format!("Notification error: {e}"), None, None);
                    results.insert(
                        "notification".to_string(),
                        json!({"success": false, "error": e.to_string()}),
                    );
                }
            }
        }

        let remaining = self.engine.service_finished(&service_id);
        if remaining == 0 {
            if let Err(e) = store.set_service_status(&service_id, "Idle").await {
                tracing::error!(service = %service_id, error = %e, "failed to mark service idle");
            }
        }

        let elapsed_secs = self.engine.deps.clock.epoch_ms().saturating_sub(start_ms) / 1000;
        let duration = format_duration(elapsed_secs);
        results.insert("duration".to_string(), json!(duration));

        if self.is_main_run {
            let stopped = self.stop_requested().await;
            let status = if stopped {
                RunStatus::Aborted
            } else {
                RunStatus::Completed
            };
            let mut state = self
                .engine
                .state()
                .snapshot(&self.parent_runtime)
                .await
                .unwrap_or(Value::Null);
            if let Some(map) = state.as_object_mut() {
                map.insert("status".to_string(), json!(status.to_string()));
            }
            let snapshot = {
                let mut main_run = self.main_run.lock();
                main_run.status = status;
                main_run.duration = Some(duration.clone());
                main_run.state = state;
                main_run.clone()
            };
            if let Err(e) = store.update_run(&snapshot).await {
                self.log("error", &format!("Failed to persist run status: {e}"), None, None);
            }
            self.engine.connections().close_all(&self.parent_runtime).await;
        }

        let task = self.main_run.lock().task.clone();
        if let Some(task) = task {
            if task.is_one_shot() {
                if let Err(e) = store.set_task_active(&task.id, false).await {
                    tracing::error!(task = %task.id, error = %e, "failed to deactivate one-shot task");
                }
            }
        }

        results.insert("properties".to_string(), self.definition_json.clone());
        results.insert(
            "trigger".to_string(),
            json!(self.main_run.lock().trigger.clone()),
        );

        let target_count = self.targets.lock().len();
        if self.is_main_run || target_count > 1 || self.def().run_method == RunMethod::Once {
            results = self.create_result(results, None, true, self.is_main_run).await;
        }

        if self.is_main_run {
            self.engine.clear_shared_state(&self.parent_runtime).await;
        }
        results
    }

    /// Open (or reuse) the named connection to a device.
    ///
    /// The cache is consulted first; `start_new_connection` forces a fresh
    /// session. Newly opened sessions are cached for the rest of the run.
    pub async fn connection(
        self: &Arc<Self>,
        family: ProtocolFamily,
        device: &Device,
    ) -> Result<Arc<dyn DeviceSession>, EngineError> {
        let def = self.def();
        let key = ConnectionKey::new(
            family,
            self.parent_runtime.clone(),
            device.name.clone(),
            def.connection_name.clone(),
        );
        if let Some(session) = self
            .engine
            .connections()
            .get(&key, def.start_new_connection)
            .await
        {
            self.log(
                "info",
                &format!("Using cached {family} connection '{}'", def.connection_name),
                Some(&device.name),
                None,
            );
            return Ok(session);
        }
        self.log(
            "info",
            &format!("OPENING {family} connection '{}'", def.connection_name),
            Some(&device.name),
            Some("security"),
        );
        let credential = self.resolve_credentials(device).await?;
        let spec = ConnectionSpec {
            family,
            device: device.clone(),
            driver: family.driver_of(device).to_string(),
            credential,
            timeout: None,
            options: serde_json::Map::new(),
        };
        let session = self.engine.deps.connector.open(&spec).await?;
        self.engine.connections().put(key, Arc::clone(&session));
        Ok(session)
    }

    /// Resolve the credential material for a device per the service's
    /// credential source.
    pub(crate) async fn resolve_credentials(
        self: &Arc<Self>,
        device: &Device,
    ) -> Result<ResolvedCredential, EngineError> {
        use nr_core::{CredentialKind, CredentialSource};
        let def = self.def();
        let credential_type = if def.credential_type.is_empty() {
            None
        } else {
            Some(def.credential_type.as_str())
        };
        let store = &self.engine.deps.store;
        let secrets = &self.engine.deps.secrets;
        let credential = store
            .credential(&self.creator, Some(&device.name), credential_type)
            .await?;
        self.log(
            "info",
            &format!(
                "Using '{}' credential for '{}'",
                credential.name, device.name
            ),
            None,
            None,
        );
        let mut resolved = ResolvedCredential {
            username: credential.username.clone(),
            ..ResolvedCredential::default()
        };
        match def.credentials {
            CredentialSource::Device => match credential.subtype {
                CredentialKind::Password => {
                    resolved.password = Some(secrets.get_password(&credential.password).await?);
                }
                CredentialKind::Key => {
                    resolved.private_key =
                        Some(secrets.get_password(&credential.private_key).await?);
                }
            },
            CredentialSource::User => {
                let mut filters = serde_json::Map::new();
                filters.insert("name".to_string(), json!(self.creator));
                let user = store.fetch("user", &filters).await?;
                resolved.username = self.creator.clone();
                let password = user
                    .get("password")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                resolved.password = Some(secrets.get_password(password).await?);
            }
            CredentialSource::Custom => {
                resolved.username = self.sub_text(&def.custom_username, None).await?;
                let password = self.sub_text(&def.custom_password, None).await?;
                resolved.password = Some(secrets.get_password(&password).await?);
            }
        }
        resolved.secret = Some(secrets.get_password(&credential.enable_password).await?);
        Ok(resolved)
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
