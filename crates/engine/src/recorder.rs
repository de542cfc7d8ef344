// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result recording: reference attachment and persistence

use crate::runner::Runner;
use nr_core::{is_success, Device, ResultMap, ResultRecord, ServiceLogRecord};
use serde_json::{Map, Value};
use std::sync::Arc;

impl Runner {
    /// Persist a result row for this runner, attaching run, service,
    /// workflow, and device references. Result values are already
    /// normalized to transport-safe JSON by the retry driver.
    ///
    /// The main run's aggregate row additionally flushes the queued service
    /// logs and, for REST-triggered runs, attaches the per-device results.
    pub(crate) async fn create_result(
        self: &Arc<Self>,
        mut results: ResultMap,
        device: Option<&Device>,
        commit: bool,
        run_result: bool,
    ) -> ResultMap {
        let def = self.def();
        let store = &self.engine().deps.store;
        let main_run = self.main_run();
        let success = is_success(&results);

        if self.is_main_run && device.is_none() {
            for (service, lines) in self.engine().drain_logs(&self.parent_runtime) {
                let record = ServiceLogRecord {
                    runtime: self.parent_runtime.clone(),
                    service,
                    content: lines.join("\n"),
                };
                if let Err(e) = store.create_service_log(&record).await {
                    tracing::error!(error = %e, "failed to persist service log");
                }
            }
            if main_run.trigger == "REST" {
                let mut devices = Map::new();
                match store.results(&self.parent_runtime).await {
                    Ok(rows) => {
                        for row in rows {
                            if let Some(name) = &row.device_name {
                                devices.insert(name.clone(), row.result);
                            }
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "failed to collect device results"),
                }
                results.insert("devices".to_string(), Value::Object(devices));
            }
        }

        let create_failed_results = def.disable_result_creation && !success;
        if !def.disable_result_creation || create_failed_results || run_result {
            let record = ResultRecord {
                run_id: main_run.id.clone(),
                service: def.id.clone(),
                service_name: def.name.clone(),
                parent_service: main_run.service_id.clone(),
                parent_runtime: self.parent_runtime.clone(),
                workflow: self.workflow.as_ref().map(|w| w.id.clone()),
                parent_device: self.parent_device.as_ref().map(|d| d.id.clone()),
                device: device.map(|d| d.id.clone()),
                device_name: device.map(|d| d.name.clone()),
                result: Value::Object(results.clone()),
                duration: results
                    .get("duration")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                success,
                tags: main_run.tags.clone(),
            };
            if let Err(e) = store.create_result(&record).await {
                self.log("error", &format!("Failed to persist result: {e}"), None, None);
            } else if commit {
                if let Err(e) = store.commit().await {
                    if let Err(rollback) = store.rollback().await {
                        tracing::error!(error = %rollback, "rollback after failed commit also failed");
                    }
                    self.log("error", &format!("Commit failed: {e}"), None, None);
                }
            }
        }
        results
    }
}
