// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::test_helpers::{definition, ok_job, summary_names, Harness, RT};
use nr_adapters::store::StoreCall;
use nr_core::{is_success, Device, DeviceId, Pool};
use serde_json::json;

#[tokio::test]
async fn explicit_targets_and_pools_are_unioned_and_deduplicated() {
    let harness = Harness::new();
    let devices = harness.add_devices(&["a", "b"]);
    let pool_member = Device::test("c");
    harness.store.add_device(pool_member.clone());
    // pool overlaps with the explicit list
    harness.store.add_pool(Pool::new(
        "pool-1",
        "lab",
        vec![devices[1].clone(), pool_member],
    ));
    let mut def = definition("svc-1");
    def.target_pools = vec!["pool-1".into()];
    let runner = harness.runner(def, ok_job("ok"), devices).await;
    let resolved = runner.compute_devices().await.unwrap();
    let names: Vec<&str> = resolved.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn update_target_pools_recomputes_membership() {
    let harness = Harness::new();
    harness.store.add_pool(Pool::new("pool-1", "lab", vec![Device::test("stale")]));
    harness
        .store
        .set_computed_devices(&"pool-1".into(), vec![Device::test("fresh")]);
    let mut def = definition("svc-1");
    def.target_pools = vec!["pool-1".into()];
    def.update_target_pools = true;
    let runner = harness.runner(def, ok_job("ok"), Vec::new()).await;
    let resolved = runner.compute_devices().await.unwrap();
    assert_eq!(resolved[0].name, "fresh");
    assert!(harness
        .store
        .calls()
        .contains(&StoreCall::ComputePool { id: "pool-1".to_string() }));
}

#[tokio::test]
async fn device_query_coerces_scalars_and_looks_up_by_property() {
    let harness = Harness::new();
    harness.add_devices(&["edge1"]);
    harness.evaluator.program("one_ip", json!("192.0.2.1"));
    let mut def = definition("svc-1");
    def.device_query = "one_ip".to_string();
    let runner = harness.runner(def, ok_job("ok"), Vec::new()).await;
    let resolved = runner.compute_devices().await.unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].name, "edge1");
}

#[tokio::test]
async fn device_query_accepts_device_shaped_values() {
    let harness = Harness::new();
    let device = Device::test("inline");
    harness
        .evaluator
        .program("inline_device", serde_json::to_value(&device).unwrap());
    let mut def = definition("svc-1");
    def.device_query = "inline_device".to_string();
    let runner = harness.runner(def, ok_job("ok"), Vec::new()).await;
    let resolved = runner.compute_devices().await.unwrap();
    assert_eq!(resolved[0].name, "inline");
}

#[tokio::test]
async fn unresolved_query_values_fail_the_run_with_one_diagnostic() {
    let harness = Harness::new();
    harness.add_devices(&["edge1"]);
    harness
        .evaluator
        .program("bad_ips", json!(["10.0.0.9", "192.0.2.1", "10.0.0.10"]));
    let mut def = definition("svc-1");
    def.device_query = "bad_ips".to_string();
    let results = harness.run_service(def, ok_job("ok"), Vec::new()).await;
    assert!(!is_success(&results));
    let message = results
        .get("result")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    assert!(message.contains("invalid targets"));
    assert!(message.contains("10.0.0.9"));
    assert!(message.contains("10.0.0.10"));
    assert!(!message.contains("192.0.2.1"));
}

#[tokio::test]
async fn acl_restrictions_remove_devices_without_failing() {
    let harness = Harness::new();
    let devices = harness.add_devices(&["allowed", "denied"]);
    harness
        .engine
        .restrict_targets(RT, [DeviceId::new("dev-allowed")]);
    let results = harness.run_service(definition("svc-1"), ok_job("ok"), devices).await;
    assert!(is_success(&results));
    assert_eq!(summary_names(&results, "success"), vec!["allowed"]);
    assert!(summary_names(&results, "failure").is_empty());
}

#[tokio::test]
async fn definition_targets_resolve_for_the_main_run() {
    let harness = Harness::new();
    let devices = harness.add_devices(&["a", "b"]);
    let mut def = definition("svc-1");
    def.target_devices = vec![devices[0].id.clone(), devices[1].id.clone()];
    let runner = harness.runner(def, ok_job("ok"), Vec::new()).await;
    let resolved = runner.compute_devices().await.unwrap();
    assert_eq!(resolved.len(), 2);
}
