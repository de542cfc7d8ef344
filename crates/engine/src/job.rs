// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service bodies

use crate::error::EngineError;
use crate::runner::Runner;
use async_trait::async_trait;
use nr_core::{Device, JobResult, ServiceDefinition};
use std::sync::Arc;

/// The executable body of a service.
///
/// For `per_device` services the runner passes each target in turn; for
/// `once` services `device` is `None`. Errors are captured into
/// `{success: false, result}` by the retry driver and count as failures.
#[async_trait]
pub trait ServiceJob: Send + Sync {
    async fn job(
        &self,
        runner: &Arc<Runner>,
        device: Option<&Device>,
    ) -> Result<JobResult, EngineError>;
}

/// A service: its persisted definition plus its body.
pub struct Service {
    pub definition: ServiceDefinition,
    pub job: Arc<dyn ServiceJob>,
}

impl Service {
    pub fn new(definition: ServiceDefinition, job: Arc<dyn ServiceJob>) -> Arc<Self> {
        Arc::new(Self { definition, job })
    }
}

/// Wrap a plain function as a service body.
pub struct FnJob<F>(pub F);

#[async_trait]
impl<F> ServiceJob for FnJob<F>
where
    F: Fn(Option<&Device>) -> Result<JobResult, EngineError> + Send + Sync,
{
    async fn job(
        &self,
        _runner: &Arc<Runner>,
        device: Option<&Device>,
    ) -> Result<JobResult, EngineError> {
        (self.0)(device)
    }
}
