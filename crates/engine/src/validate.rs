// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result validation: text matching and dictionary matching

use crate::convert::value_to_text;
use crate::error::EngineError;
use crate::runner::Runner;
use nr_core::{Device, ValidationMethod};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Remove all whitespace (`delete_spaces_before_matching`).
pub(crate) fn strip_whitespace(input: &str) -> String {
    input.split_whitespace().collect()
}

/// Substring or regex containment.
pub(crate) fn text_match(pattern: &str, section: &str, use_regex: bool) -> Result<bool, EngineError> {
    if use_regex {
        let re = regex::Regex::new(pattern)
            .map_err(|e| EngineError::Configuration(format!("invalid content match pattern: {e}")))?;
        Ok(re.is_match(section))
    } else {
        Ok(section.contains(pattern))
    }
}

/// Verify that every key/value of `matcher` is consumed by `result`.
///
/// Keys match anywhere in the result's nesting; list values are consumed
/// element-wise. Succeeds when nothing of the matcher remains.
pub(crate) fn dict_included(result: &Value, matcher: &Value) -> bool {
    let mut remaining = matcher.as_object().cloned().unwrap_or_default();
    consume(result, &mut remaining);
    remaining.is_empty()
}

fn consume(result: &Value, matcher: &mut Map<String, Value>) {
    match result {
        Value::Object(map) => {
            for (key, value) in map {
                let pop = match matcher.get_mut(key) {
                    Some(Value::Array(expected)) if value.is_array() => {
                        if let Some(items) = value.as_array() {
                            for item in items {
                                if let Some(pos) = expected.iter().position(|e| e == item) {
                                    expected.remove(pos);
                                }
                            }
                        }
                        expected.is_empty()
                    }
                    Some(expected) => expected == value,
                    None => false,
                };
                if pop {
                    matcher.remove(key);
                } else {
                    consume(value, matcher);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                consume(item, matcher);
            }
        }
        _ => {}
    }
}

impl Runner {
    /// Validate the extracted section against the service's match
    /// definition. Returns the success flag and the `validation` record.
    pub(crate) async fn validate_result(
        self: &Arc<Self>,
        section: &Value,
        device: Option<&Device>,
    ) -> Result<(bool, Value), EngineError> {
        let def = self.def();
        match def.validation_method {
            ValidationMethod::Text => {
                let matched = self.sub_text(&def.content_match, device).await?;
                let mut section_text = value_to_text(section);
                let mut pattern = matched.clone();
                if def.delete_spaces_before_matching {
                    pattern = strip_whitespace(&pattern);
                    section_text = strip_whitespace(&section_text);
                }
                let success = text_match(&pattern, &section_text, def.content_match_regex)?;
                Ok((
                    success,
                    json!({"path": def.validation_section, "value": section, "match": matched}),
                ))
            }
            ValidationMethod::DictEqual | ValidationMethod::DictIncluded => {
                let interpolated = self.sub_value(&def.dict_match, device).await?;
                let success = match def.validation_method {
                    // dict_equal compares against the raw match definition;
                    // the interpolated form is still reported below
                    ValidationMethod::DictEqual => section == &def.dict_match,
                    _ => dict_included(section, &interpolated),
                };
                Ok((
                    success,
                    json!({"path": def.validation_section, "value": section, "match": interpolated}),
                ))
            }
        }
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
