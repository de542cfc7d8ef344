// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service definitions and their behavioral knobs

use crate::device::DeviceId;
use crate::pool::PoolId;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a service definition.
    pub struct ServiceId;
}

/// How a service body is dispatched over its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMethod {
    /// One body invocation for the whole target list
    Once,
    /// One body invocation per device
    #[default]
    PerDevice,
}

/// Normalization applied to the `result` value after the body returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionMethod {
    #[default]
    None,
    Text,
    Json,
    Xml,
}

impl fmt::Display for ConversionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionMethod::None => write!(f, "none"),
            ConversionMethod::Text => write!(f, "text"),
            ConversionMethod::Json => write!(f, "json"),
            ConversionMethod::Xml => write!(f, "xml"),
        }
    }
}

/// How a result is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMethod {
    #[default]
    Text,
    DictEqual,
    DictIncluded,
}

/// Outcomes for which a processing step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCondition {
    #[default]
    Always,
    Success,
    Failure,
}

impl OutcomeCondition {
    /// Whether the step should run given the current success flag.
    pub fn applies(&self, success: bool) -> bool {
        match self {
            OutcomeCondition::Always => true,
            OutcomeCondition::Success => success,
            OutcomeCondition::Failure => !success,
        }
    }
}

impl fmt::Display for OutcomeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeCondition::Always => write!(f, "always"),
            OutcomeCondition::Success => write!(f, "success"),
            OutcomeCondition::Failure => write!(f, "failure"),
        }
    }
}

/// Postprocessing gating reuses the outcome condition semantics.
pub type PostprocessingMode = OutcomeCondition;

/// When validation runs. `None` disables it entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCondition {
    #[default]
    None,
    Always,
    Success,
    Failure,
}

impl ValidationCondition {
    /// Whether validation should run given the current success flag.
    pub fn applies(&self, success: bool) -> bool {
        match self {
            ValidationCondition::None => false,
            ValidationCondition::Always => true,
            ValidationCondition::Success => success,
            ValidationCondition::Failure => !success,
        }
    }
}

/// What a skipped device contributes to the run outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipValue {
    #[default]
    Success,
    Failure,
    /// Drop the device entirely: no result row, no summary entry
    Discard,
}

/// Notification backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMethod {
    #[default]
    Email,
    Chat,
    Webhook,
}

/// Where connection credentials come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    #[default]
    Device,
    User,
    Custom,
}

fn default_max_processes() -> u32 {
    5
}

fn default_max_retries() -> u32 {
    100
}

fn default_connection_name() -> String {
    "default".to_string()
}

fn default_validation_section() -> String {
    "results['result']".to_string()
}

/// Static, persisted definition of a service: everything about its behavior
/// except the body itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub id: ServiceId,
    pub name: String,
    /// Name qualified by the owning workflow, used in logs and notifications
    #[serde(default)]
    pub scoped_name: String,
    #[serde(default)]
    pub service_type: String,

    // --- dispatch ---
    #[serde(default)]
    pub run_method: RunMethod,
    #[serde(default)]
    pub multiprocessing: bool,
    #[serde(default = "default_max_processes")]
    pub max_processes: u32,

    // --- targets ---
    #[serde(default)]
    pub target_devices: Vec<DeviceId>,
    #[serde(default)]
    pub target_pools: Vec<PoolId>,
    #[serde(default)]
    pub update_target_pools: bool,
    #[serde(default)]
    pub update_pools_after_running: bool,
    #[serde(default)]
    pub device_query: String,
    #[serde(default = "default_device_query_property")]
    pub device_query_property: String,

    // --- retries ---
    #[serde(default)]
    pub number_of_retries: u32,
    #[serde(default = "default_max_retries")]
    pub max_number_of_retries: u32,
    #[serde(default)]
    pub time_between_retries: u64,
    /// Post-body sleep in seconds, applied per device
    #[serde(default)]
    pub waiting_time: u64,

    // --- processing hooks ---
    #[serde(default)]
    pub preprocessing: String,
    #[serde(default)]
    pub postprocessing: String,
    #[serde(default)]
    pub postprocessing_mode: PostprocessingMode,

    // --- conversion / validation ---
    #[serde(default)]
    pub conversion_method: ConversionMethod,
    #[serde(default)]
    pub validation_method: ValidationMethod,
    #[serde(default)]
    pub validation_condition: ValidationCondition,
    #[serde(default = "default_validation_section")]
    pub validation_section: String,
    #[serde(default)]
    pub content_match: String,
    #[serde(default)]
    pub content_match_regex: bool,
    #[serde(default)]
    pub delete_spaces_before_matching: bool,
    #[serde(default)]
    pub dict_match: serde_json::Value,
    #[serde(default)]
    pub negative_logic: bool,

    // --- skip ---
    #[serde(default)]
    pub skip_query: String,
    #[serde(default)]
    pub skip_value: SkipValue,

    // --- iteration ---
    #[serde(default)]
    pub iteration_values: String,
    #[serde(default)]
    pub iteration_variable_name: String,
    #[serde(default)]
    pub iteration_devices: String,
    #[serde(default = "default_device_query_property")]
    pub iteration_devices_property: String,

    // --- notification ---
    #[serde(default)]
    pub send_notification: bool,
    #[serde(default)]
    pub send_notification_method: NotificationMethod,
    #[serde(default)]
    pub notification_header: String,
    #[serde(default)]
    pub include_link_in_summary: bool,
    #[serde(default)]
    pub include_device_results: bool,
    #[serde(default)]
    pub display_only_failed_nodes: bool,
    #[serde(default)]
    pub mail_recipient: String,
    #[serde(default)]
    pub reply_to: String,

    // --- connections ---
    #[serde(default)]
    pub start_new_connection: bool,
    #[serde(default)]
    pub close_connection: bool,
    #[serde(default = "default_connection_name")]
    pub connection_name: String,
    #[serde(default)]
    pub credentials: CredentialSource,
    #[serde(default)]
    pub credential_type: String,
    #[serde(default)]
    pub custom_username: String,
    #[serde(default)]
    pub custom_password: String,

    // --- results ---
    #[serde(default)]
    pub disable_result_creation: bool,
}

fn default_device_query_property() -> String {
    "ip_address".to_string()
}

impl ServiceDefinition {
    pub fn new(id: impl Into<ServiceId>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            scoped_name: name.clone(),
            name,
            service_type: "service".to_string(),
            run_method: RunMethod::default(),
            multiprocessing: false,
            max_processes: default_max_processes(),
            target_devices: Vec::new(),
            target_pools: Vec::new(),
            update_target_pools: false,
            update_pools_after_running: false,
            device_query: String::new(),
            device_query_property: default_device_query_property(),
            number_of_retries: 0,
            max_number_of_retries: default_max_retries(),
            time_between_retries: 0,
            waiting_time: 0,
            preprocessing: String::new(),
            postprocessing: String::new(),
            postprocessing_mode: PostprocessingMode::default(),
            conversion_method: ConversionMethod::default(),
            validation_method: ValidationMethod::default(),
            validation_condition: ValidationCondition::default(),
            validation_section: default_validation_section(),
            content_match: String::new(),
            content_match_regex: false,
            delete_spaces_before_matching: false,
            dict_match: serde_json::Value::Null,
            negative_logic: false,
            skip_query: String::new(),
            skip_value: SkipValue::default(),
            iteration_values: String::new(),
            iteration_variable_name: String::new(),
            iteration_devices: String::new(),
            iteration_devices_property: default_device_query_property(),
            send_notification: false,
            send_notification_method: NotificationMethod::default(),
            notification_header: String::new(),
            include_link_in_summary: false,
            include_device_results: false,
            display_only_failed_nodes: false,
            mail_recipient: String::new(),
            reply_to: String::new(),
            start_new_connection: false,
            close_connection: false,
            connection_name: default_connection_name(),
            credentials: CredentialSource::default(),
            credential_type: String::new(),
            custom_username: String::new(),
            custom_password: String::new(),
            disable_result_creation: false,
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
