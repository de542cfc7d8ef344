// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::dict_to_string;
use crate::test_helpers::{definition, failing_job, ok_job, Harness};
use nr_core::{is_success, NotificationMethod, Settings};
use serde_json::json;

fn notifying_settings() -> Settings {
    let mut settings = Settings::default();
    settings.app.address = "https://automation.example.net".to_string();
    settings.chat.channel = "#network-ops".to_string();
    settings.webhook.channel = "ops".to_string();
    settings
}

#[tokio::test]
async fn chat_notifications_carry_the_summary() {
    let harness = Harness::with_settings(notifying_settings());
    let devices = harness.add_devices(&["edge1", "edge2"]);
    let mut def = definition("svc-1");
    def.send_notification = true;
    def.send_notification_method = NotificationMethod::Chat;
    def.include_link_in_summary = true;
    let results = harness.run_service(def, ok_job("all good"), devices).await;

    assert_eq!(
        results.get("notification").and_then(|n| n.get("success")),
        Some(&json!(true))
    );
    let sent = harness.chat.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].channel, "#network-ops");
    assert_eq!(sent[0].subject, "PASS: service svc-1");
    assert!(sent[0].body.contains("Status: PASS"));
    assert!(sent[0].body.contains("PASSED"));
    assert!(sent[0].body.contains("https://automation.example.net"));
    assert!(harness.mail.sent().is_empty());
    assert!(harness.webhook.sent().is_empty());
}

#[tokio::test]
async fn failed_runs_notify_with_failed_status() {
    let harness = Harness::with_settings(notifying_settings());
    let devices = harness.add_devices(&["edge1"]);
    let mut def = definition("svc-1");
    def.send_notification = true;
    def.send_notification_method = NotificationMethod::Webhook;
    let results = harness.run_service(def, failing_job("broken"), devices).await;

    assert!(!is_success(&results));
    let sent = harness.webhook.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].channel, "ops");
    assert!(sent[0].subject.starts_with("FAILED:"));
    assert!(sent[0].body.contains("FAILED"));
}

#[tokio::test]
async fn display_only_failed_nodes_suppresses_the_passed_list() {
    let harness = Harness::with_settings(notifying_settings());
    let devices = harness.add_devices(&["good", "bad"]);
    let job = std::sync::Arc::new(crate::FnJob(|device: Option<&nr_core::Device>| {
        Ok(crate::test_helpers::job_result(
            device.map(|d| d.name.as_str()) == Some("good"),
            "r",
        ))
    }));
    let mut def = definition("svc-1");
    def.send_notification = true;
    def.send_notification_method = NotificationMethod::Chat;
    def.display_only_failed_nodes = true;
    harness.run_service(def, job, devices).await;

    let sent = harness.chat.sent();
    assert!(sent[0].body.contains("FAILED"));
    assert!(!sent[0].body.contains("PASSED"));
}

#[tokio::test]
async fn email_notifications_attach_device_results() {
    let harness = Harness::with_settings(notifying_settings());
    let devices = harness.add_devices(&["edge1"]);
    let mut def = definition("svc-1");
    def.send_notification = true;
    def.send_notification_method = NotificationMethod::Email;
    def.include_device_results = true;
    def.mail_recipient = "ops@example.net".to_string();
    def.reply_to = "runner@example.net".to_string();
    harness.run_service(def, ok_job("backup done"), devices).await;

    let sent = harness.mail.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "ops@example.net");
    assert_eq!(sent[0].reply_to.as_deref(), Some("runner@example.net"));
    let attachment = sent[0].attachment.as_ref().unwrap();
    assert!(attachment.filename.starts_with("results-"));
    assert!(attachment.filename.ends_with(".txt"));
    assert!(attachment.content.contains("Device Results"));
    assert!(attachment.content.contains("edge1"));
}

#[tokio::test]
async fn notification_failures_do_not_fail_the_run() {
    let harness = Harness::with_settings(notifying_settings());
    let devices = harness.add_devices(&["edge1"]);
    harness.chat.fail_next();
    let mut def = definition("svc-1");
    def.send_notification = true;
    def.send_notification_method = NotificationMethod::Chat;
    let results = harness.run_service(def, ok_job("fine"), devices).await;

    assert!(is_success(&results));
    let notification = results.get("notification").cloned().unwrap_or_default();
    assert_eq!(notification.get("success"), Some(&json!(false)));
    assert!(notification.get("error").is_some());
}

#[tokio::test]
async fn notification_headers_are_templated() {
    let harness = Harness::with_settings(notifying_settings());
    let devices = harness.add_devices(&["edge1"]);
    let mut def = definition("svc-1");
    def.send_notification = true;
    def.send_notification_method = NotificationMethod::Chat;
    def.notification_header = "window {{ maintenance_window }}".to_string();
    harness.evaluator.program("maintenance_window", json!("MW-42"));
    harness.run_service(def, ok_job("fine"), devices).await;

    assert!(harness.chat.sent()[0].body.contains("window MW-42"));
}

#[test]
fn dict_to_string_renders_nested_maps() {
    let value = json!({"Service": "backup", "Results": {"edge1": "ok"}});
    let rendered = dict_to_string(&value, 0);
    assert!(rendered.contains("Service: backup"));
    assert!(rendered.contains("Results:"));
    assert!(rendered.contains("\tedge1: ok"));
}
