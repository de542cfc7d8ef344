// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn definition_defaults_are_safe() {
    let def = ServiceDefinition::new("svc-1", "get version");
    assert_eq!(def.run_method, RunMethod::PerDevice);
    assert_eq!(def.number_of_retries, 0);
    assert_eq!(def.max_number_of_retries, 100);
    assert_eq!(def.connection_name, "default");
    assert_eq!(def.validation_section, "results['result']");
    assert_eq!(def.device_query_property, "ip_address");
    assert!(!def.multiprocessing);
}

#[test]
fn definition_deserializes_from_sparse_json() {
    let def: ServiceDefinition = serde_json::from_value(serde_json::json!({
        "id": "svc-2",
        "name": "backup",
        "run_method": "once",
        "conversion_method": "json",
        "skip_value": "discard",
    }))
    .unwrap();
    assert_eq!(def.run_method, RunMethod::Once);
    assert_eq!(def.conversion_method, ConversionMethod::Json);
    assert_eq!(def.skip_value, SkipValue::Discard);
    assert_eq!(def.max_processes, 5);
}

#[yare::parameterized(
    always_pass  = { OutcomeCondition::Always,  true,  true },
    always_fail  = { OutcomeCondition::Always,  false, true },
    success_pass = { OutcomeCondition::Success, true,  true },
    success_fail = { OutcomeCondition::Success, false, false },
    failure_pass = { OutcomeCondition::Failure, true,  false },
    failure_fail = { OutcomeCondition::Failure, false, true },
)]
fn outcome_condition_applies(condition: OutcomeCondition, success: bool, expected: bool) {
    assert_eq!(condition.applies(success), expected);
}

#[test]
fn conversion_method_displays_lowercase() {
    assert_eq!(ConversionMethod::Xml.to_string(), "xml");
    assert_eq!(ConversionMethod::None.to_string(), "none");
}
