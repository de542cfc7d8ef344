// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn set_and_get_global_variable() {
    let payload = Payload::default();
    payload.set("vlan", json!(120), None, None);
    let value = payload.get("vlan", None, None, None, false).unwrap();
    assert_eq!(value, Some(json!(120)));
    assert_eq!(payload.variables().get("vlan"), Some(&json!(120)));
}

#[test]
fn device_scope_does_not_leak_globally() {
    let payload = Payload::default();
    payload.set("prompt", json!("edge1#"), Some("edge1"), None);
    payload.set("prompt", json!("edge2#"), Some("edge2"), None);
    assert_eq!(
        payload.device_variables("edge1").get("prompt"),
        Some(&json!("edge1#"))
    );
    assert_eq!(
        payload.device_variables("edge2").get("prompt"),
        Some(&json!("edge2#"))
    );
    assert!(payload.get("prompt", None, None, None, true).unwrap().is_none());
}

#[test]
fn section_scope_nests_under_device() {
    let payload = Payload::default();
    payload.set("count", json!(3), Some("edge1"), Some("interfaces"));
    let value = payload
        .get("count", Some("edge1"), Some("interfaces"), None, false)
        .unwrap();
    assert_eq!(value, Some(json!(3)));
}

#[test]
fn missing_name_without_allow_none_is_an_error() {
    let payload = Payload::default();
    let err = payload.get("absent", None, None, None, false).unwrap_err();
    assert!(err.to_string().contains("absent"));
    // default substitutes before the check
    let value = payload
        .get("absent", None, None, Some(json!("fallback")), false)
        .unwrap();
    assert_eq!(value, Some(json!("fallback")));
}

#[test]
fn append_requires_an_existing_list() {
    let payload = Payload::default();
    assert!(payload.append("log", json!("x"), None, None).is_err());
    payload.set("log", json!([]), None, None);
    payload.append("log", json!("first"), None, None).unwrap();
    payload.append("log", json!("second"), None, None).unwrap();
    let value = payload.get("log", None, None, None, false).unwrap();
    assert_eq!(value, Some(json!(["first", "second"])));
}

#[test]
fn form_values_are_read_only_side_channel() {
    let payload = Payload::new(json!({"form": {"approver": "ops"}}));
    assert_eq!(payload.form_value("approver"), Some(json!("ops")));
    assert_eq!(payload.form_value("missing"), None);
}

#[test]
fn clones_share_state_across_the_run_tree() {
    let payload = Payload::default();
    let child = payload.clone();
    child.set("seen", json!(true), None, None);
    assert_eq!(
        payload.get("seen", None, None, None, false).unwrap(),
        Some(json!(true))
    );
}

#[test]
fn merge_overwrites_top_level_keys() {
    let payload = Payload::new(json!({"variables": {"a": 1}}));
    payload.merge(&json!({"variables": {"b": 2}, "form": {}}));
    assert_eq!(payload.variables().get("b"), Some(&json!(2)));
    assert!(payload.variables().get("a").is_none());
}
