// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The retry driver: one (service, device) attempt loop
//!
//! Per attempt: stop check, preprocessing, body, conversion,
//! postprocessing, validation, then back-off. `number_of_retries` is the
//! baseline counter (postprocessing may reset it); total attempts never
//! exceed `max_number_of_retries`.

use crate::convert::convert_result;
use crate::error::EngineError;
use crate::runner::Runner;
use nr_core::{failure, is_success, to_json_compliant, Device, ResultMap};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

impl Runner {
    /// Drive one device (or the whole run, for `once` services) through the
    /// retry state machine. Never errors: every failure mode is folded into
    /// the returned result map.
    pub(crate) async fn run_service_job(self: &Arc<Self>, device: Option<&Device>) -> ResultMap {
        let def = self.def();
        let device_name = device.map(|d| d.name.as_str());
        let mut retries = def.number_of_retries + 1;
        let mut total: u32 = 0;
        let mut results = failure("No attempt could be made (retry budget exhausted)");
        while retries > 0 && total < def.max_number_of_retries {
            if self.stop_requested().await {
                self.log(
                    "error",
                    &format!("ABORTING {} (STOP)", device_name.unwrap_or("run")),
                    device_name,
                    None,
                );
                return failure("Stopped");
            }
            retries -= 1;
            total += 1;
            // signed on purpose: a postprocessing reset above the baseline
            // leaves later attempts with a negative retry index
            let retry_index = def.number_of_retries as i64 - retries as i64;
            if retry_index != 0 {
                self.log("error", &format!("RETRY n°{retry_index}"), device_name, None);
            }
            results = match self.attempt(device, &mut retries).await {
                Ok(map) => map,
                Err(e) => {
                    let message = e.to_string();
                    self.log("error", &message, device_name, None);
                    failure(message)
                }
            };
            if is_success(&results) {
                return results;
            }
            if retries > 0 && total < def.max_number_of_retries && def.time_between_retries > 0 {
                tokio::time::sleep(Duration::from_secs(def.time_between_retries)).await;
            }
        }
        results
    }

    /// One attempt: preprocess, body, convert, postprocess, validate.
    async fn attempt(
        self: &Arc<Self>,
        device: Option<&Device>,
        retries: &mut u32,
    ) -> Result<ResultMap, EngineError> {
        let def = self.def();
        let device_name = device.map(|d| d.name.as_str());

        if !def.preprocessing.is_empty() {
            // a clean exit aborts only the preprocessing block
            self.exec(&def.preprocessing, device, Default::default())
                .await?;
        }

        let mut results = match self.service.job.job(self, device).await {
            Ok(job_results) => to_json_compliant(job_results),
            Err(e) => {
                let message = e.to_string();
                self.log("error", &message, device_name, None);
                failure(message)
            }
        };

        results = convert_result(def.conversion_method, results);
        if !results.contains_key("success") {
            results.insert("success".to_string(), json!(true));
        }

        if !def.postprocessing.is_empty() {
            if def.postprocessing_mode.applies(is_success(&results)) {
                let mut locals = nr_adapters::Scope::new();
                locals.insert("results".to_string(), Value::Object(results.clone()));
                let scope = self.exec(&def.postprocessing, device, locals).await?;
                if let Some(value) = scope.get("retries").and_then(Value::as_u64) {
                    *retries = value as u32;
                }
            } else {
                self.log(
                    "warning",
                    &format!(
                        "Postprocessing was skipped as it is set to {} only, but the service {}",
                        def.postprocessing_mode,
                        if is_success(&results) { "passed" } else { "failed" }
                    ),
                    device_name,
                    None,
                );
            }
        }

        if def.validation_condition.applies(is_success(&results)) {
            let mut locals = nr_adapters::Scope::new();
            locals.insert("results".to_string(), Value::Object(results.clone()));
            let section = self.eval(&def.validation_section, device, locals).await?;
            let (mut success, validation) = self.validate_result(&section, device).await?;
            if def.negative_logic {
                success = !success;
            }
            results.insert("validation".to_string(), validation);
            results.insert("success".to_string(), json!(success));
        }
        Ok(results)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
