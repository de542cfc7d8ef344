// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification dispatch: summary formatting and backend selection

use crate::error::EngineError;
use crate::runner::Runner;
use nr_adapters::{Attachment, Notification, NotifyTransport};
use nr_core::{is_success, NotificationMethod, ResultMap};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Render a value as indented `key: value` lines, the shape used for email
/// bodies and attachments.
pub(crate) fn dict_to_string(value: &Value, depth: usize) -> String {
    let tab = "\t".repeat(depth);
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| dict_to_string(item, depth + 1))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("\n{tab}{key}: {}", dict_to_string(value, depth + 1)))
            .collect::<Vec<_>>()
            .join(""),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Runner {
    /// Build the notification summary map.
    pub(crate) async fn build_notification(
        self: &Arc<Self>,
        results: &ResultMap,
    ) -> Result<Map<String, Value>, EngineError> {
        let def = self.def();
        let mut notification = Map::new();
        notification.insert(
            "Service".to_string(),
            json!(format!("{} ({})", def.name, def.service_type)),
        );
        notification.insert("Runtime".to_string(), json!(self.runtime));
        notification.insert(
            "Status".to_string(),
            json!(if is_success(results) { "PASS" } else { "FAILED" }),
        );
        if let Some(result) = results.get("result") {
            notification.insert("Results".to_string(), result.clone());
        }
        if !def.notification_header.is_empty() {
            let header = self.sub_text(&def.notification_header, None).await?;
            notification.insert("Header".to_string(), json!(header));
        }
        if def.include_link_in_summary {
            let address = &self.engine().settings().app.address;
            let run_id = self.main_run().id;
            notification.insert(
                "Link".to_string(),
                json!(format!(
                    "{address}/view_service_results/{run_id}/{}",
                    def.id
                )),
            );
        }
        if let Some(summary) = results.get("summary") {
            let failed = summary.get("failure").and_then(Value::as_array);
            if let Some(failed) = failed.filter(|a| !a.is_empty()) {
                notification.insert("FAILED".to_string(), json!(failed));
            }
            let passed = summary.get("success").and_then(Value::as_array);
            if let Some(passed) = passed.filter(|a| !a.is_empty()) {
                if !def.display_only_failed_nodes {
                    notification.insert("PASSED".to_string(), json!(passed));
                }
            }
        }
        Ok(notification)
    }

    /// Format and send the run notification through the configured backend.
    /// Returns the `notification` record to attach to the results.
    pub(crate) async fn notify(self: &Arc<Self>, results: &ResultMap) -> Result<Value, EngineError> {
        let def = self.def();
        self.log(
            "info",
            &format!("Sending {:?} notification...", def.send_notification_method),
            None,
            None,
        );
        let summary = self.build_notification(results).await?;
        let mut file_content = summary.clone();
        if def.include_device_results {
            let store = &self.engine().deps.store;
            let mut device_results = Map::new();
            for device in self.target_devices() {
                if let Some(row) = store
                    .result_for_device(&def.id, &self.parent_runtime, &device.id)
                    .await?
                {
                    device_results.insert(device.name.clone(), row.result);
                }
            }
            file_content.insert("Device Results".to_string(), Value::Object(device_results));
        }

        let status = if is_success(results) { "PASS" } else { "FAILED" };
        let engine = self.engine();
        let mut notification = Notification {
            subject: format!("{status}: {}", def.name),
            body: dict_to_string(&Value::Object(summary), 0),
            recipient: def.mail_recipient.clone(),
            reply_to: if def.reply_to.is_empty() {
                None
            } else {
                Some(def.reply_to.clone())
            },
            channel: String::new(),
            attachment: None,
        };
        let transport: &Arc<dyn NotifyTransport> = match def.send_notification_method {
            NotificationMethod::Email => {
                let filename = self.runtime.replace(['.', ':'], "");
                notification.attachment = Some(Attachment {
                    filename: format!("results-{filename}.txt"),
                    content: dict_to_string(&Value::Object(file_content), 0),
                });
                &engine.deps.mail
            }
            NotificationMethod::Chat => {
                notification.channel = engine.settings().chat.channel.clone();
                &engine.deps.chat
            }
            NotificationMethod::Webhook => {
                notification.channel = engine.settings().webhook.channel.clone();
                &engine.deps.webhook
            }
        };
        let response = transport.send(&notification).await?;
        Ok(json!({"success": true, "result": response}))
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
