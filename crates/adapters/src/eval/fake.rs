// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake evaluator for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{EvalError, Evaluator, HelperHost, Scope};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

type EvalFn = dyn Fn(&Scope, &dyn HelperHost) -> Result<Value, EvalError> + Send + Sync;
type ExecFn = dyn Fn(&Scope, &dyn HelperHost) -> Result<Scope, EvalError> + Send + Sync;

/// Recorded evaluator call
#[derive(Debug, Clone, PartialEq)]
pub enum EvalCall {
    Eval { src: String },
    Exec { src: String },
}

#[derive(Default)]
struct FakeEvaluatorState {
    evals: HashMap<String, Arc<EvalFn>>,
    execs: HashMap<String, Arc<ExecFn>>,
    calls: Vec<EvalCall>,
}

/// Scriptable evaluator.
///
/// Unprogrammed expressions fall back to literals (`true`, `false`, JSON)
/// and bare scope-variable lookup; unprogrammed statement blocks return the
/// scope unchanged.
#[derive(Clone, Default)]
pub struct FakeEvaluator {
    inner: Arc<Mutex<FakeEvaluatorState>>,
}

impl FakeEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program an expression to return a fixed value.
    pub fn program(&self, src: &str, value: Value) {
        self.program_fn(src, move |_, _| Ok(value.clone()));
    }

    /// Program an expression with full access to scope and helpers.
    pub fn program_fn(
        &self,
        src: &str,
        f: impl Fn(&Scope, &dyn HelperHost) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) {
        self.inner.lock().evals.insert(src.to_string(), Arc::new(f));
    }

    /// Program a statement block to merge fixed bindings into the scope.
    pub fn program_exec(&self, src: &str, bindings: Scope) {
        self.program_exec_fn(src, move |scope, _| {
            let mut out = scope.clone();
            for (k, v) in &bindings {
                out.insert(k.clone(), v.clone());
            }
            Ok(out)
        });
    }

    /// Program a statement block to exit cleanly.
    pub fn program_exec_clean_exit(&self, src: &str) {
        self.program_exec_fn(src, |_, _| Err(EvalError::CleanExit));
    }

    /// Program a statement block with full access to scope and helpers.
    pub fn program_exec_fn(
        &self,
        src: &str,
        f: impl Fn(&Scope, &dyn HelperHost) -> Result<Scope, EvalError> + Send + Sync + 'static,
    ) {
        self.inner.lock().execs.insert(src.to_string(), Arc::new(f));
    }

    pub fn calls(&self) -> Vec<EvalCall> {
        self.inner.lock().calls.clone()
    }

    pub fn eval_count(&self, src: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, EvalCall::Eval { src: s } if s == src))
            .count()
    }
}

fn fallback_eval(src: &str, scope: &Scope) -> Result<Value, EvalError> {
    match src {
        "true" | "True" => return Ok(Value::Bool(true)),
        "false" | "False" => return Ok(Value::Bool(false)),
        "none" | "None" => return Ok(Value::Null),
        _ => {}
    }
    if let Some(value) = scope.get(src) {
        return Ok(value.clone());
    }
    if let Some(value) = subscript_lookup(src, scope) {
        return Ok(value);
    }
    if let Ok(value) = serde_json::from_str::<Value>(src) {
        return Ok(value);
    }
    Err(EvalError::Failed(format!("no behavior programmed for: {src}")))
}

/// Resolve subscript chains like `results['result']['state']` against the
/// scope, so default extraction expressions work unprogrammed.
fn subscript_lookup(src: &str, scope: &Scope) -> Option<Value> {
    if !src.ends_with(']') {
        return None;
    }
    let open = src.find('[')?;
    let mut current = scope.get(src[..open].trim())?.clone();
    for segment in src[open..].trim_end_matches(']').split("][") {
        let key = segment
            .trim_start_matches('[')
            .trim()
            .trim_matches('\'')
            .trim_matches('"');
        current = current.get(key)?.clone();
    }
    Some(current)
}

#[async_trait]
impl Evaluator for FakeEvaluator {
    async fn eval(
        &self,
        src: &str,
        scope: &Scope,
        helpers: &dyn HelperHost,
    ) -> Result<Value, EvalError> {
        let programmed = {
            let mut inner = self.inner.lock();
            inner.calls.push(EvalCall::Eval {
                src: src.to_string(),
            });
            inner.evals.get(src).cloned()
        };
        match programmed {
            Some(f) => f(scope, helpers),
            None => fallback_eval(src, scope),
        }
    }

    async fn exec(
        &self,
        src: &str,
        scope: &Scope,
        helpers: &dyn HelperHost,
    ) -> Result<Scope, EvalError> {
        let programmed = {
            let mut inner = self.inner.lock();
            inner.calls.push(EvalCall::Exec {
                src: src.to_string(),
            });
            inner.execs.get(src).cloned()
        };
        match programmed {
            Some(f) => f(scope, helpers),
            None => Ok(scope.clone()),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
