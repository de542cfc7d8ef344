// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

struct NullHelpers;

#[async_trait]
impl HelperHost for NullHelpers {
    async fn fetch(&self, _model: &str, _filters: Scope) -> Result<Value, EvalError> {
        Ok(Value::Null)
    }
    async fn fetch_all(&self, _model: &str) -> Result<Value, EvalError> {
        Ok(Value::Null)
    }
    async fn factory(&self, _model: &str, _fields: Scope) -> Result<Value, EvalError> {
        Ok(Value::Null)
    }
    async fn delete(&self, _model: &str, _filters: Scope) -> Result<Value, EvalError> {
        Ok(Value::Null)
    }
    async fn get_credential(
        &self,
        _device: Option<&str>,
        _credential_type: Option<&str>,
    ) -> Result<Value, EvalError> {
        Ok(Value::Null)
    }
    async fn send_email(
        &self,
        _recipient: &str,
        _subject: &str,
        _body: &str,
    ) -> Result<(), EvalError> {
        Ok(())
    }
    async fn encrypt(&self, plaintext: &str) -> Result<String, EvalError> {
        Ok(plaintext.to_string())
    }
    async fn get_result(
        &self,
        _service_name: &str,
        _device: Option<&str>,
        _workflow: Option<&str>,
    ) -> Result<Value, EvalError> {
        Ok(Value::Null)
    }
    fn settings(&self) -> Value {
        Value::Null
    }
    fn devices(&self) -> Value {
        json!([])
    }
    fn get_var(
        &self,
        _name: &str,
        _device: Option<&str>,
        _section: Option<&str>,
    ) -> Result<Value, EvalError> {
        Ok(Value::Null)
    }
    fn set_var(&self, _name: &str, _value: Value, _device: Option<&str>, _section: Option<&str>) {}
    fn log(&self, _severity: &str, _message: &str) {}
}

#[tokio::test]
async fn fallback_handles_literals_and_scope_lookup() {
    let eval = FakeEvaluator::new();
    let mut scope = Scope::new();
    scope.insert("hostname".to_string(), json!("edge1"));

    assert_eq!(eval.eval("true", &scope, &NullHelpers).await.unwrap(), json!(true));
    assert_eq!(
        eval.eval("hostname", &scope, &NullHelpers).await.unwrap(),
        json!("edge1")
    );
    assert_eq!(
        eval.eval("[1, 2]", &scope, &NullHelpers).await.unwrap(),
        json!([1, 2])
    );
    assert!(eval.eval("unknown()", &scope, &NullHelpers).await.is_err());
}

#[tokio::test]
async fn programmed_expressions_win_over_fallback() {
    let eval = FakeEvaluator::new();
    eval.program("true", json!("overridden"));
    assert_eq!(
        eval.eval("true", &Scope::new(), &NullHelpers).await.unwrap(),
        json!("overridden")
    );
    assert_eq!(eval.eval_count("true"), 1);
}

#[tokio::test]
async fn exec_merges_programmed_bindings() {
    let eval = FakeEvaluator::new();
    let mut bindings = Scope::new();
    bindings.insert("retries".to_string(), json!(3));
    eval.program_exec("set_retries()", bindings);

    let mut scope = Scope::new();
    scope.insert("existing".to_string(), json!(1));
    let out = eval.exec("set_retries()", &scope, &NullHelpers).await.unwrap();
    assert_eq!(out.get("retries"), Some(&json!(3)));
    assert_eq!(out.get("existing"), Some(&json!(1)));
}

#[tokio::test]
async fn clean_exit_is_distinguishable() {
    let eval = FakeEvaluator::new();
    eval.program_exec_clean_exit("exit()");
    let err = eval.exec("exit()", &Scope::new(), &NullHelpers).await;
    assert!(matches!(err, Err(EvalError::CleanExit)));
}

#[tokio::test]
async fn unprogrammed_exec_returns_scope_unchanged() {
    let eval = FakeEvaluator::new();
    let mut scope = Scope::new();
    scope.insert("a".to_string(), json!(1));
    let out = eval.exec("noop", &scope, &NullHelpers).await.unwrap();
    assert_eq!(out, scope);
}

#[tokio::test]
async fn fallback_resolves_subscript_chains() {
    let eval = FakeEvaluator::new();
    let mut scope = Scope::new();
    scope.insert(
        "results".to_string(),
        json!({"result": {"state": "up", "count": 2}}),
    );
    assert_eq!(
        eval.eval("results['result']", &scope, &NullHelpers).await.unwrap(),
        json!({"state": "up", "count": 2})
    );
    assert_eq!(
        eval.eval("results['result']['state']", &scope, &NullHelpers)
            .await
            .unwrap(),
        json!("up")
    );
    assert!(eval
        .eval("results['missing']", &scope, &NullHelpers)
        .await
        .is_err());
}
