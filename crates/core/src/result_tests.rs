// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use serde_json::json;

#[test]
fn opaque_values_are_stringified() {
    let mut results = JobResult::new();
    results.insert("success".to_string(), true.into());
    results.insert("result".to_string(), JobValue::opaque(vec![1u8, 2, 3]));
    let out = to_json_compliant(results);
    assert_eq!(out.get("result"), Some(&json!("[1, 2, 3]")));
    assert_eq!(out.get("success"), Some(&json!(true)));
}

#[test]
fn json_values_pass_through_unchanged() {
    let mut results = JobResult::new();
    results.insert("result".to_string(), json!({"a": [1, 2], "b": null}).into());
    let out = to_json_compliant(results);
    assert_eq!(out.get("result"), Some(&json!({"a": [1, 2], "b": null})));
}

proptest! {
    // Feeding the compliant output back through the walk changes nothing.
    #[test]
    fn to_json_compliant_is_idempotent(text in ".*", n in any::<i64>()) {
        let mut results = JobResult::new();
        results.insert("text".to_string(), JobValue::Opaque(text));
        results.insert("n".to_string(), n.into());
        let once = to_json_compliant(results);
        let again: JobResult = once
            .clone()
            .into_iter()
            .map(|(k, v)| (k, JobValue::Json(v)))
            .collect();
        prop_assert_eq!(to_json_compliant(again), once);
    }
}

#[test]
fn failure_map_shape() {
    let map = failure("boom");
    assert!(!is_success(&map));
    assert_eq!(map.get("result"), Some(&json!("boom")));
}

#[test]
fn is_success_defaults_false() {
    assert!(!is_success(&ResultMap::new()));
    let mut map = ResultMap::new();
    map.insert("success".to_string(), json!("yes"));
    assert!(!is_success(&map));
}

#[test]
fn summary_records_in_order() {
    let mut summary = Summary::default();
    summary.record(true, "a");
    summary.record(false, "b");
    summary.record(true, "c");
    assert_eq!(summary.success, vec!["a", "c"]);
    assert_eq!(summary.failure, vec!["b"]);
    assert_eq!(
        summary.to_value(),
        json!({"success": ["a", "c"], "failure": ["b"]})
    );
}
