// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nr-core: Domain model for the NetRunner automation engine

pub mod clock;
pub mod device;
pub mod id;
pub mod payload;
pub mod pool;
pub mod records;
pub mod result;
pub mod service;
pub mod settings;
pub mod time_fmt;

pub use clock::{Clock, FakeClock, SystemClock};
pub use device::{Device, DeviceId, DeviceTimestamps};
pub use payload::{Payload, PayloadError};
pub use pool::{Pool, PoolId};
pub use records::{
    Credential, CredentialKind, PlaceholderRef, ResolvedCredential, ResultRecord, RunId, RunRecord,
    RunStatus, ServiceLogRecord, TaskId, TaskRef, WorkflowId, WorkflowRef, WorkflowRunMethod,
};
pub use result::{failure, is_success, to_json_compliant, JobResult, JobValue, ResultMap, Summary};
pub use service::{
    ConversionMethod, CredentialSource, NotificationMethod, OutcomeCondition, PostprocessingMode,
    RunMethod, ServiceDefinition, ServiceId, SkipValue, ValidationCondition, ValidationMethod,
};
pub use settings::{Settings, SettingsError};
pub use time_fmt::{format_duration, runtime_stamp};
