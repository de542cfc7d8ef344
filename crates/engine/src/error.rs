// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use thiserror::Error;

/// Errors that short-circuit a run (everything retryable is carried as data
/// inside result maps instead).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("device query invalid targets: {0}")]
    InvalidTargets(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("state error: {0}")]
    State(#[from] nr_state::StateError),
    #[error("store error: {0}")]
    Store(#[from] nr_adapters::StoreError),
    #[error("evaluation error: {0}")]
    Eval(#[from] nr_adapters::EvalError),
    #[error("transport error: {0}")]
    Transport(#[from] nr_adapters::TransportError),
    #[error("notification error: {0}")]
    Notify(#[from] nr_adapters::NotifyError),
    #[error("secret error: {0}")]
    Secret(#[from] nr_adapters::SecretError),
    #[error("payload error: {0}")]
    Payload(#[from] nr_core::PayloadError),
    #[error("job error: {0}")]
    Job(String),
}
