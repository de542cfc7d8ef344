// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandboxed expression evaluator interface
//!
//! The evaluator executes user-supplied text against a variable scope. It is
//! an external collaborator: implementations must sandbox execution, enforce
//! the configured import deny-list, and route side effects through the
//! [`HelperHost`] the engine supplies with each call.

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{EvalCall, FakeEvaluator};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Variable scope handed to an evaluation.
pub type Scope = serde_json::Map<String, Value>;

/// Errors from expression evaluation
#[derive(Debug, Error)]
pub enum EvalError {
    /// The script requested a clean exit; recoverable, aborts only the block
    #[error("clean exit")]
    CleanExit,
    #[error("expression failed: {0}")]
    Failed(String),
    #[error("forbidden import: {0}")]
    ForbiddenImport(String),
    #[error("helper error: {0}")]
    Helper(String),
}

/// Engine-side bindings available to user expressions.
///
/// Store access is RBAC-checked per operation and model; the remaining
/// helpers expose the runner's context (payload, devices, logging, secrets).
#[async_trait]
pub trait HelperHost: Send + Sync {
    async fn fetch(&self, model: &str, filters: Scope) -> Result<Value, EvalError>;
    async fn fetch_all(&self, model: &str) -> Result<Value, EvalError>;
    async fn factory(&self, model: &str, fields: Scope) -> Result<Value, EvalError>;
    async fn delete(&self, model: &str, filters: Scope) -> Result<Value, EvalError>;

    async fn get_credential(
        &self,
        device: Option<&str>,
        credential_type: Option<&str>,
    ) -> Result<Value, EvalError>;

    async fn send_email(&self, recipient: &str, subject: &str, body: &str)
        -> Result<(), EvalError>;

    async fn encrypt(&self, plaintext: &str) -> Result<String, EvalError>;

    async fn get_result(
        &self,
        service_name: &str,
        device: Option<&str>,
        workflow: Option<&str>,
    ) -> Result<Value, EvalError>;

    /// Engine settings as a read-only value
    fn settings(&self) -> Value;

    /// Names of the current target devices
    fn devices(&self) -> Value;

    fn get_var(
        &self,
        name: &str,
        device: Option<&str>,
        section: Option<&str>,
    ) -> Result<Value, EvalError>;

    fn set_var(&self, name: &str, value: Value, device: Option<&str>, section: Option<&str>);

    fn log(&self, severity: &str, message: &str);
}

/// The evaluator itself.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluate an expression and return its value.
    async fn eval(
        &self,
        src: &str,
        scope: &Scope,
        helpers: &dyn HelperHost,
    ) -> Result<Value, EvalError>;

    /// Execute a statement block and return the final variable scope.
    async fn exec(
        &self,
        src: &str,
        scope: &Scope,
        helpers: &dyn HelperHost,
    ) -> Result<Scope, EvalError>;
}
