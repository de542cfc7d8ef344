// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device fan-out: skip filtering, once/per-device dispatch, iteration

use crate::error::EngineError;
use crate::expression::truthy;
use crate::runner::{Runner, RunnerSpawn};
use nr_core::{
    failure, format_duration, is_success, Device, ResultMap, RunMethod, SkipValue, Summary,
};
use nr_state::WriteMethod;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

impl Runner {
    /// Resolve targets and dispatch the service body over them.
    pub(crate) async fn device_run(self: &Arc<Self>) -> Result<ResultMap, EngineError> {
        let targets = self.compute_devices().await?;
        self.set_targets(targets.clone());
        let def = self.def();
        let progress_key = self.progress_key();

        // Iteration over derived devices spawns one sub-runner per target.
        if !def.iteration_devices.is_empty() && !self.iteration_run {
            if self.workflow.is_none() {
                let mut results = failure("Device iteration not allowed outside of a workflow");
                results.insert("runtime".to_string(), json!(self.runtime));
                return Ok(results);
            }
            self.write_state(
                "progress/device/total",
                json!(targets.len()),
                WriteMethod::Increment,
            )
            .await;
            let mut summary = Summary::default();
            for device in &targets {
                let success = self.device_iteration(device).await?;
                let key = if success { "success" } else { "failure" };
                self.write_state(
                    &format!("progress/device/{key}"),
                    json!(1),
                    WriteMethod::Increment,
                )
                .await;
                summary.record(success, &device.name);
            }
            let mut results = ResultMap::new();
            results.insert("success".to_string(), json!(summary.failure.is_empty()));
            results.insert("summary".to_string(), summary.to_value());
            results.insert("runtime".to_string(), json!(self.runtime));
            return Ok(results);
        }

        self.write_state(
            &format!("{progress_key}/total"),
            json!(targets.len()),
            WriteMethod::Increment,
        )
        .await;

        let workflow_name = self.workflow.as_ref().map(|w| w.name.clone());
        let skip_service = workflow_name
            .as_deref()
            .and_then(|name| self.skip.get(name).copied())
            .unwrap_or(false);
        if skip_service {
            self.write_state("status", json!("Skipped"), WriteMethod::Set)
                .await;
        }

        // A target-less `once` service can still skip itself by query.
        if def.run_method == RunMethod::Once && targets.is_empty() && !def.skip_query.is_empty() {
            let skipped = truthy(&self.eval(&def.skip_query, None, Default::default()).await?);
            if skipped {
                self.write_state("status", json!("Skipped"), WriteMethod::Set)
                    .await;
                let mut results = ResultMap::new();
                results.insert(
                    "success".to_string(),
                    json!(def.skip_value == SkipValue::Success),
                );
                results.insert("result".to_string(), json!("skipped"));
                results.insert("runtime".to_string(), json!(self.runtime));
                return Ok(results);
            }
        }

        let mut retained = Vec::new();
        let mut skipped_rows: Vec<ResultMap> = Vec::new();
        let mut skipped_names: Vec<String> = Vec::new();
        for device in targets {
            let mut skip_device = skip_service;
            if !skip_service && !def.skip_query.is_empty() {
                let value = self
                    .eval(&def.skip_query, Some(&device), Default::default())
                    .await?;
                skip_device = truthy(&value);
            }
            if !skip_device {
                retained.push(device);
                continue;
            }
            self.write_state(
                &format!("{progress_key}/skipped"),
                json!(1),
                WriteMethod::Increment,
            )
            .await;
            if def.skip_value == SkipValue::Discard {
                continue;
            }
            let mut row = ResultMap::new();
            row.insert("device_target".to_string(), json!(device.name));
            row.insert("runtime".to_string(), json!(self.engine().issue_runtime()));
            row.insert("result".to_string(), json!("skipped"));
            row.insert("duration".to_string(), json!("0:00:00"));
            row.insert(
                "success".to_string(),
                json!(def.skip_value == SkipValue::Success),
            );
            skipped_names.push(device.name.clone());
            self.create_result(row.clone(), Some(&device), false, false)
                .await;
            skipped_rows.push(row);
        }
        self.set_targets(retained.clone());

        if def.run_method != RunMethod::PerDevice {
            let mut results = self.get_results(None, true).await;
            if !results.contains_key("summary") {
                let mut summary = Summary::default();
                let success = is_success(&results);
                for device in &retained {
                    summary.record(success, &device.name);
                }
                results.insert("summary".to_string(), summary.to_value());
            }
            for key in ["success", "failure"] {
                let count = results
                    .get("summary")
                    .and_then(|s| s.get(key))
                    .and_then(Value::as_array)
                    .map(|a| a.len())
                    .unwrap_or(0);
                self.write_state(
                    &format!("{progress_key}/{key}"),
                    json!(count),
                    WriteMethod::Increment,
                )
                .await;
            }
            if !skipped_names.is_empty() {
                let key = match def.skip_value {
                    SkipValue::Success => "success",
                    _ => "failure",
                };
                if let Some(Value::Array(bucket)) =
                    results.get_mut("summary").and_then(|s| s.get_mut(key))
                {
                    bucket.extend(skipped_names.iter().map(|n| json!(n)));
                }
            }
            return Ok(results);
        }

        if self.is_main_run && retained.is_empty() {
            let message = "The service 'Run method' is set to 'Per device' mode, \
                 but no targets have been selected";
            self.log("error", message, None, None);
            let mut results = failure(message);
            results.insert("runtime".to_string(), json!(self.runtime));
            return Ok(results);
        }

        let mut device_results = skipped_rows;
        if def.multiprocessing && retained.len() > 1 {
            let workers = retained.len().min(def.max_processes as usize);
            self.log(
                "info",
                &format!("Starting a pool of {workers} workers"),
                None,
                None,
            );
            let semaphore = Arc::new(Semaphore::new(workers));
            let mut tasks = JoinSet::new();
            for device in retained {
                let runner = Arc::clone(self);
                let semaphore = Arc::clone(&semaphore);
                tasks.spawn(async move {
                    let _permit = semaphore.acquire().await;
                    runner.get_results(Some(&device), true).await
                });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(result) => device_results.push(result),
                    Err(e) => device_results.push(failure(format!("worker failed: {e}"))),
                }
            }
        } else {
            for device in retained {
                device_results.push(self.get_results(Some(&device), false).await);
            }
        }

        let mut summary = Summary::default();
        let mut all_success = true;
        for result in &device_results {
            let success = is_success(result);
            all_success &= success;
            let name = result
                .get("device_target")
                .and_then(Value::as_str)
                .unwrap_or_default();
            summary.record(success, name);
        }
        let mut results = ResultMap::new();
        results.insert("summary".to_string(), summary.to_value());
        results.insert("success".to_string(), json!(all_success));
        results.insert("runtime".to_string(), json!(self.runtime));
        Ok(results)
    }

    /// Spawn a sub-runner iterating this service over devices derived from
    /// the target device. Returns the child's aggregate success.
    pub(crate) async fn device_iteration(
        self: &Arc<Self>,
        device: &Device,
    ) -> Result<bool, EngineError> {
        let def = self.def();
        let derived = self
            .devices_from_query(
                &def.iteration_devices,
                &def.iteration_devices_property,
                Some(device),
            )
            .await?;
        let spawn = RunnerSpawn {
            service: Arc::clone(&self.service),
            parent_runtime: self.parent_runtime.clone(),
            is_main_run: false,
            parent_path: Some(self.path.clone()),
            iteration_run: true,
            parent_device: Some(device.clone()),
            target_devices: derived,
            payload: self.payload.clone(),
            workflow: self.workflow.clone(),
            workflow_run_method: None,
            skip: Default::default(),
        };
        // type-erased to break the async recursion through Runner::run
        let engine = Arc::clone(self.engine());
        let child: Pin<Box<dyn Future<Output = Result<ResultMap, EngineError>> + Send>> =
            Box::pin(async move { Runner::run(engine, spawn).await });
        let results = child.await?;
        Ok(is_success(&results))
    }

    /// Run the body for one device (or once for the whole run), including
    /// iteration values, progress accounting, and the per-device epilogue.
    pub(crate) async fn get_results(
        self: &Arc<Self>,
        device: Option<&Device>,
        commit: bool,
    ) -> ResultMap {
        let device_name = device.map(|d| d.name.as_str());
        self.log("info", "STARTING", device_name, None);
        let start_ms = self.engine().deps.clock.epoch_ms();
        let mut results = ResultMap::new();
        results.insert(
            "device_target".to_string(),
            device_name.map(|n| json!(n)).unwrap_or(Value::Null),
        );

        let def = self.def();
        let outcome: Result<ResultMap, EngineError> = if !def.iteration_values.is_empty() {
            self.iteration_value_results(device).await
        } else {
            Ok(self.run_service_job(device).await)
        };
        match outcome {
            Ok(map) => {
                for (key, value) in map {
                    results.insert(key, value);
                }
            }
            Err(e) => {
                let message = e.to_string();
                self.log("error", &message, device_name, None);
                results.insert("success".to_string(), json!(false));
                results.insert("result".to_string(), json!(message));
            }
        }

        let elapsed = self.engine().deps.clock.epoch_ms().saturating_sub(start_ms) / 1000;
        results.insert("duration".to_string(), json!(format_duration(elapsed)));

        if let Some(device) = device {
            if def.close_connection || self.is_main_run {
                self.engine()
                    .connections()
                    .close_device(&self.parent_runtime, &device.name)
                    .await;
            }
            let key = if is_success(&results) {
                "success"
            } else {
                "failure"
            };
            self.write_state(
                &format!("{}/{key}", self.progress_key()),
                json!(1),
                WriteMethod::Increment,
            )
            .await;
            let mut row = ResultMap::new();
            row.insert("runtime".to_string(), json!(self.engine().issue_runtime()));
            for (k, v) in &results {
                row.insert(k.clone(), v.clone());
            }
            self.create_result(row, Some(device), commit, false).await;
        }
        self.log("info", "FINISHED", device_name, None);

        if def.waiting_time > 0 {
            self.log(
                "info",
                &format!("SLEEP {} seconds...", def.waiting_time),
                device_name,
                None,
            );
            tokio::time::sleep(std::time::Duration::from_secs(def.waiting_time)).await;
        }
        if !is_success(&results) {
            self.write_state("success", json!(false), WriteMethod::Set)
                .await;
        }
        results
    }

    /// Loop the body over evaluated iteration values, binding each into the
    /// payload under the iteration variable before the attempt.
    async fn iteration_value_results(
        self: &Arc<Self>,
        device: Option<&Device>,
    ) -> Result<ResultMap, EngineError> {
        let def = self.def();
        let device_name = device.map(|d| d.name.as_str());
        let values = self
            .eval(&def.iteration_values, device, Default::default())
            .await?;
        let entries: Vec<(String, Value)> = match values {
            Value::Object(map) => map.into_iter().collect(),
            Value::Array(items) => items
                .into_iter()
                .map(|v| (crate::convert::value_to_text(&v), v))
                .collect(),
            Value::Null => Vec::new(),
            scalar => vec![(crate::convert::value_to_text(&scalar), scalar)],
        };
        let mut target_results = Map::new();
        let mut all_success = true;
        for (name, value) in entries {
            self.payload
                .set(&def.iteration_variable_name, value, device_name, None);
            let attempt = self.run_service_job(device).await;
            all_success &= is_success(&attempt);
            target_results.insert(name, Value::Object(attempt));
        }
        let mut results = ResultMap::new();
        results.insert("result".to_string(), Value::Object(target_results));
        results.insert("success".to_string(), json!(all_success));
        Ok(results)
    }
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
