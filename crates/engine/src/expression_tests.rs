// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{definition, ok_job, Harness};
use nr_adapters::{HelperHost, ObjectStore};
use nr_core::{Device, ResultRecord, Settings};
use serde_json::json;

#[tokio::test]
async fn sub_text_replaces_templates_from_scope() {
    let harness = Harness::new();
    let runner = harness.runner(definition("svc-1"), ok_job("ok"), Vec::new()).await;
    runner.payload.set("vlan", json!(120), None, None);
    let out = runner.sub_text("interface vlan {{ vlan }}", None).await.unwrap();
    assert_eq!(out, "interface vlan 120");
    // substitution is stable once the templates are gone
    let again = runner.sub_text(&out, None).await.unwrap();
    assert_eq!(again, out);
}

#[tokio::test]
async fn sub_text_is_identity_without_templates() {
    let harness = Harness::new();
    let runner = harness.runner(definition("svc-1"), ok_job("ok"), Vec::new()).await;
    let input = "plain text { not a template } }}";
    assert_eq!(runner.sub_text(input, None).await.unwrap(), input);
    // and therefore idempotent
    let once = runner.sub_text(input, None).await.unwrap();
    assert_eq!(runner.sub_text(&once, None).await.unwrap(), once);
}

#[tokio::test]
async fn sub_value_recurses_into_keys_and_values() {
    let harness = Harness::new();
    let runner = harness.runner(definition("svc-1"), ok_job("ok"), Vec::new()).await;
    runner.payload.set("name", json!("edge1"), None, None);
    let input = json!({"host {{ name }}": ["{{ name }}", 1], "static": true});
    let out = runner.sub_value(&input, None).await.unwrap();
    assert_eq!(
        out,
        json!({"host edge1": ["edge1", 1], "static": true})
    );
}

#[tokio::test]
async fn scope_prefers_device_variables_over_globals() {
    let harness = Harness::new();
    let device = Device::test("edge1");
    let runner = harness.runner(definition("svc-1"), ok_job("ok"), vec![device.clone()]).await;
    runner.payload.set("prompt", json!("global#"), None, None);
    runner.payload.set("prompt", json!("edge1#"), Some("edge1"), None);

    let scope = runner.build_scope(Some(&device), Default::default());
    assert_eq!(scope.get("prompt"), Some(&json!("edge1#")));
    let scope = runner.build_scope(None, Default::default());
    assert_eq!(scope.get("prompt"), Some(&json!("global#")));
}

#[tokio::test]
async fn scope_carries_device_and_payload_bindings() {
    let harness = Harness::new();
    let device = Device::test("edge1");
    let runner = harness.runner(definition("svc-1"), ok_job("ok"), vec![device.clone()]).await;
    let scope = runner.build_scope(Some(&device), Default::default());
    assert_eq!(
        scope.get("device").and_then(|d| d.get("name")),
        Some(&json!("edge1"))
    );
    assert!(scope.contains_key("payload"));
    assert_eq!(
        scope.get("parent_device").and_then(|d| d.get("name")),
        Some(&json!("edge1"))
    );
}

fn rbac_settings() -> Settings {
    let mut settings = Settings::default();
    settings
        .security
        .allowed_models
        .insert("fetch".to_string(), vec!["device".to_string()]);
    settings
}

#[tokio::test]
async fn helper_fetch_enforces_the_model_whitelist() {
    let harness = Harness::with_settings(rbac_settings());
    harness.store.add_row("device", json!({"name": "edge1"}));
    harness.store.add_row("user", json!({"name": "admin"}));
    let runner = harness.runner(definition("svc-1"), ok_job("ok"), Vec::new()).await;
    let helpers = runner.helpers(None);

    let mut filters = nr_adapters::Scope::new();
    filters.insert("name".to_string(), json!("edge1"));
    let device = helpers.fetch("device", filters).await.unwrap();
    assert_eq!(device.get("name"), Some(&json!("edge1")));

    let mut filters = nr_adapters::Scope::new();
    filters.insert("name".to_string(), json!("admin"));
    let err = helpers.fetch("user", filters).await.unwrap_err();
    assert!(err.to_string().contains("not allowed"));
}

#[tokio::test]
async fn helper_variables_read_and_write_the_payload() {
    let harness = Harness::new();
    let device = Device::test("edge1");
    let runner = harness.runner(definition("svc-1"), ok_job("ok"), vec![device.clone()]).await;
    let helpers = runner.helpers(Some(&device));

    helpers.set_var("checked", json!(true), Some("edge1"), None);
    assert_eq!(
        helpers.get_var("checked", Some("edge1"), None).unwrap(),
        json!(true)
    );
    assert!(helpers.get_var("checked", None, None).is_err());
}

#[tokio::test]
async fn helper_get_result_reads_persisted_results() {
    let harness = Harness::new();
    let runner = harness.runner(definition("svc-1"), ok_job("ok"), Vec::new()).await;
    harness
        .store
        .create_result(&ResultRecord {
            run_id: "run-1".into(),
            service: "svc-0".into(),
            service_name: "earlier step".to_string(),
            parent_service: "svc-root".into(),
            parent_runtime: crate::test_helpers::RT.to_string(),
            workflow: None,
            parent_device: None,
            device: None,
            device_name: None,
            result: json!({"success": true, "result": "collected"}),
            duration: "0:00:01".to_string(),
            success: true,
            tags: Vec::new(),
        })
        .await
        .unwrap();
    let found = runner.get_result("earlier step", None, None).await.unwrap();
    assert_eq!(found.get("result"), Some(&json!("collected")));
    let missing = runner.get_result("no such step", None, None).await.unwrap();
    assert_eq!(missing, json!(null));
}

#[tokio::test]
async fn helper_encrypt_uses_the_secret_store() {
    let harness = Harness::new();
    let runner = harness.runner(definition("svc-1"), ok_job("ok"), Vec::new()).await;
    let helpers = runner.helpers(None);
    assert_eq!(helpers.encrypt("s3cret").await.unwrap(), "enc:s3cret");
}

#[tokio::test]
async fn truthiness_follows_the_evaluators_conventions() {
    use crate::expression::truthy;
    assert!(!truthy(&json!(null)));
    assert!(!truthy(&json!(false)));
    assert!(!truthy(&json!(0)));
    assert!(!truthy(&json!("")));
    assert!(!truthy(&json!([])));
    assert!(truthy(&json!("x")));
    assert!(truthy(&json!(1)));
    assert!(truthy(&json!([0])));
}
