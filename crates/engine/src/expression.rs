// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expression host: scope construction, helper bindings, templating
//!
//! Wraps the external evaluator. Each evaluation sees the caller's locals,
//! the payload's global variables, the device-scoped variables when a
//! device is in scope, and the engine's data bindings; callable helpers go
//! through [`HelperHost`] with RBAC checks on store access.

use crate::error::EngineError;
use crate::runner::Runner;
use async_trait::async_trait;
use nr_adapters::{EvalError, HelperHost, Notification, Scope};
use nr_core::Device;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use crate::convert::value_to_text;

fn template_regex() -> &'static Regex {
    static TEMPLATE: OnceLock<Regex> = OnceLock::new();
    TEMPLATE.get_or_init(|| {
        // the pattern is a literal; a parse failure is unreachable
        #[allow(clippy::unwrap_used)]
        let re = Regex::new(r"\{\{(.*?)\}\}").unwrap();
        re
    })
}

/// Python-style truthiness for evaluated guard expressions.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

impl Runner {
    /// Build the variable scope for one evaluation: locals, then payload
    /// globals, then device-scoped variables, then the data bindings.
    pub(crate) fn build_scope(&self, device: Option<&Device>, locals: Scope) -> Scope {
        let mut scope = locals;
        for (key, value) in self.payload.variables() {
            scope.insert(key, value);
        }
        if let Some(device) = device {
            for (key, value) in self.payload.device_variables(&device.name) {
                scope.insert(key, value);
            }
            scope.insert(
                "device".to_string(),
                serde_json::to_value(device).unwrap_or(Value::Null),
            );
        }
        scope.insert("payload".to_string(), self.payload.snapshot());
        if let Some(workflow) = &self.workflow {
            scope.insert(
                "workflow".to_string(),
                serde_json::to_value(workflow).unwrap_or(Value::Null),
            );
        }
        if let Some(parent) = self.parent_device.as_ref().or(device) {
            scope.insert(
                "parent_device".to_string(),
                serde_json::to_value(parent).unwrap_or(Value::Null),
            );
        }
        if let Some(placeholder) = self.main_run().placeholder {
            scope.insert(
                "placeholder".to_string(),
                serde_json::to_value(&placeholder).unwrap_or(Value::Null),
            );
        }
        scope
    }

    pub(crate) fn helpers(self: &Arc<Self>, device: Option<&Device>) -> RunnerHelpers {
        RunnerHelpers {
            runner: Arc::clone(self),
            device: device.cloned(),
        }
    }

    /// Evaluate an expression. Empty sources evaluate to null.
    pub async fn eval(
        self: &Arc<Self>,
        src: &str,
        device: Option<&Device>,
        locals: Scope,
    ) -> Result<Value, EngineError> {
        if src.is_empty() {
            return Ok(Value::Null);
        }
        let scope = self.build_scope(device, locals);
        let helpers = self.helpers(device);
        Ok(self
            .engine()
            .deps
            .evaluator
            .eval(src, &scope, &helpers)
            .await?)
    }

    /// Execute a statement block and return the final scope. A clean exit
    /// aborts only the block and yields an empty scope.
    pub async fn exec(
        self: &Arc<Self>,
        src: &str,
        device: Option<&Device>,
        locals: Scope,
    ) -> Result<Scope, EngineError> {
        if src.is_empty() {
            return Ok(Scope::new());
        }
        let scope = self.build_scope(device, locals);
        let helpers = self.helpers(device);
        match self
            .engine()
            .deps
            .evaluator
            .exec(src, &scope, &helpers)
            .await
        {
            Ok(scope) => Ok(scope),
            Err(EvalError::CleanExit) => Ok(Scope::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace every `{{ expr }}` in the input with the string form of its
    /// evaluation. Idempotent on template-free strings.
    pub async fn sub_text(
        self: &Arc<Self>,
        input: &str,
        device: Option<&Device>,
    ) -> Result<String, EngineError> {
        let re = template_regex();
        let mut out = String::new();
        let mut last = 0;
        for caps in re.captures_iter(input) {
            let full = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            let expr = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            out.push_str(&input[last..full.start()]);
            let value = self.eval(expr, device, Scope::new()).await?;
            out.push_str(&value_to_text(&value));
            last = full.end();
        }
        out.push_str(&input[last..]);
        Ok(out)
    }

    /// Template substitution over an arbitrary value: recurses into lists
    /// and maps, applying to both keys and values.
    pub(crate) fn sub_value<'a>(
        self: &'a Arc<Self>,
        input: &'a Value,
        device: Option<&'a Device>,
    ) -> Pin<Box<dyn Future<Output = Result<Value, EngineError>> + Send + 'a>> {
        Box::pin(async move {
            match input {
                Value::String(text) => Ok(Value::String(self.sub_text(text, device).await?)),
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(self.sub_value(item, device).await?);
                    }
                    Ok(Value::Array(out))
                }
                Value::Object(map) => {
                    let mut out = Map::new();
                    for (key, value) in map {
                        let key = self.sub_text(key, device).await?;
                        out.insert(key, self.sub_value(value, device).await?);
                    }
                    Ok(Value::Object(out))
                }
                other => Ok(other.clone()),
            }
        })
    }

    /// Look up a persisted result by service name within this run tree.
    pub(crate) async fn get_result(
        &self,
        service_name: &str,
        device: Option<&str>,
        workflow: Option<&str>,
    ) -> Result<Value, EngineError> {
        let workflow_name = workflow
            .map(str::to_string)
            .or_else(|| self.workflow.as_ref().map(|w| w.name.clone()));
        let record = self
            .engine()
            .deps
            .store
            .result_by_service_name(
                service_name,
                &self.parent_runtime,
                device,
                workflow_name.as_deref(),
            )
            .await?;
        Ok(record.map(|r| r.result).unwrap_or(Value::Null))
    }
}

/// The runner's side of the helper bindings, carrying the device context of
/// the current evaluation.
pub(crate) struct RunnerHelpers {
    runner: Arc<Runner>,
    device: Option<Device>,
}

impl RunnerHelpers {
    fn rbac(&self, operation: &str, model: &str) -> Result<(), EvalError> {
        if self
            .runner
            .engine()
            .settings()
            .security
            .allows(operation, model)
        {
            Ok(())
        } else {
            Err(EvalError::Helper(format!(
                "Use of '{operation}' is not allowed on {model}"
            )))
        }
    }

    fn device_name(&self) -> Option<&str> {
        self.device.as_ref().map(|d| d.name.as_str())
    }
}

fn helper_err(e: impl std::fmt::Display) -> EvalError {
    EvalError::Helper(e.to_string())
}

#[async_trait]
impl HelperHost for RunnerHelpers {
    async fn fetch(&self, model: &str, filters: Scope) -> Result<Value, EvalError> {
        self.rbac("fetch", model)?;
        self.runner
            .engine()
            .deps
            .store
            .fetch(model, &filters)
            .await
            .map_err(helper_err)
    }

    async fn fetch_all(&self, model: &str) -> Result<Value, EvalError> {
        self.rbac("fetch_all", model)?;
        self.runner
            .engine()
            .deps
            .store
            .fetch_all(model)
            .await
            .map(Value::Array)
            .map_err(helper_err)
    }

    async fn factory(&self, model: &str, fields: Scope) -> Result<Value, EvalError> {
        self.rbac("factory", model)?;
        self.runner
            .engine()
            .deps
            .store
            .factory(model, fields)
            .await
            .map_err(helper_err)
    }

    async fn delete(&self, model: &str, filters: Scope) -> Result<Value, EvalError> {
        self.rbac("delete", model)?;
        self.runner
            .engine()
            .deps
            .store
            .delete(model, &filters)
            .await
            .map(|_| Value::Null)
            .map_err(helper_err)
    }

    async fn get_credential(
        &self,
        device: Option<&str>,
        credential_type: Option<&str>,
    ) -> Result<Value, EvalError> {
        let engine = self.runner.engine();
        let credential = engine
            .deps
            .store
            .credential(&self.runner.creator, device, credential_type)
            .await
            .map_err(helper_err)?;
        let secrets = &engine.deps.secrets;
        let mut out = Map::new();
        out.insert("username".to_string(), json!(credential.username));
        match credential.subtype {
            nr_core::CredentialKind::Password => {
                let password = secrets
                    .get_password(&credential.password)
                    .await
                    .map_err(helper_err)?;
                out.insert("password".to_string(), json!(password));
            }
            nr_core::CredentialKind::Key => {
                let key = secrets
                    .get_password(&credential.private_key)
                    .await
                    .map_err(helper_err)?;
                out.insert("private_key".to_string(), json!(key));
            }
        }
        let secret = secrets
            .get_password(&credential.enable_password)
            .await
            .map_err(helper_err)?;
        out.insert("secret".to_string(), json!(secret));
        Ok(Value::Object(out))
    }

    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EvalError> {
        let notification = Notification {
            subject: subject.to_string(),
            body: body.to_string(),
            recipient: recipient.to_string(),
            ..Notification::default()
        };
        self.runner
            .engine()
            .deps
            .mail
            .send(&notification)
            .await
            .map(|_| ())
            .map_err(helper_err)
    }

    async fn encrypt(&self, plaintext: &str) -> Result<String, EvalError> {
        self.runner
            .engine()
            .deps
            .secrets
            .encrypt_password(plaintext)
            .await
            .map_err(helper_err)
    }

    async fn get_result(
        &self,
        service_name: &str,
        device: Option<&str>,
        workflow: Option<&str>,
    ) -> Result<Value, EvalError> {
        self.runner
            .get_result(service_name, device, workflow)
            .await
            .map_err(helper_err)
    }

    fn settings(&self) -> Value {
        serde_json::to_value(self.runner.engine().settings()).unwrap_or(Value::Null)
    }

    fn devices(&self) -> Value {
        Value::Array(
            self.runner
                .target_devices()
                .into_iter()
                .map(|d| Value::String(d.name))
                .collect(),
        )
    }

    fn get_var(
        &self,
        name: &str,
        device: Option<&str>,
        section: Option<&str>,
    ) -> Result<Value, EvalError> {
        self.runner
            .payload
            .get(name, device, section, None, false)
            .map(|v| v.unwrap_or(Value::Null))
            .map_err(helper_err)
    }

    fn set_var(&self, name: &str, value: Value, device: Option<&str>, section: Option<&str>) {
        self.runner.payload.set(name, value, device, section);
    }

    fn log(&self, severity: &str, message: &str) {
        self.runner
            .log(severity, message, self.device_name(), None);
    }
}

#[cfg(test)]
#[path = "expression_tests.rs"]
mod tests;
