// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[yare::parameterized(
    substring_hit  = { "up",    "Interface is up", false, true },
    substring_miss = { "down",  "Interface is up", false, false },
    regex_hit      = { r"ge-\d/\d/\d", "ge-0/0/1 up", true, true },
    regex_miss     = { r"xe-\d",       "ge-0/0/1 up", true, false },
)]
fn text_matching(pattern: &str, section: &str, use_regex: bool, expected: bool) {
    assert_eq!(text_match(pattern, section, use_regex).unwrap(), expected);
}

#[test]
fn invalid_regex_is_a_configuration_error() {
    assert!(text_match("(", "anything", true).is_err());
}

#[test]
fn strip_whitespace_removes_everything() {
    assert_eq!(strip_whitespace("a b\tc\nd"), "abcd");
}

#[test]
fn dict_included_matches_nested_keys() {
    let result = json!({"system": {"hostname": "edge1", "uptime": 42}, "extra": true});
    assert!(dict_included(&result, &json!({"hostname": "edge1"})));
    assert!(dict_included(&result, &json!({"hostname": "edge1", "uptime": 42})));
    assert!(!dict_included(&result, &json!({"hostname": "edge2"})));
    assert!(!dict_included(&result, &json!({"missing": 1})));
}

#[test]
fn dict_included_consumes_lists_element_wise() {
    let result = json!({"interfaces": ["ge-0", "ge-1", "ge-2"]});
    assert!(dict_included(&result, &json!({"interfaces": ["ge-1"]})));
    assert!(dict_included(&result, &json!({"interfaces": ["ge-0", "ge-2"]})));
    assert!(!dict_included(&result, &json!({"interfaces": ["ge-9"]})));
}

#[test]
fn dict_included_searches_inside_result_lists() {
    let result = json!([{"name": "a"}, {"name": "b", "vlan": 7}]);
    assert!(dict_included(&result, &json!({"vlan": 7})));
}

#[test]
fn empty_matcher_always_succeeds() {
    assert!(dict_included(&json!({"anything": 1}), &json!({})));
}
