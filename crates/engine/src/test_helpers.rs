// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test harness: an engine wired to fakes, plus service builders.

use crate::{Engine, EngineDeps, FnJob, Runner, RunnerSpawn, Service, ServiceJob};
use nr_adapters::{FakeConnector, FakeEvaluator, FakeNotifier, FakeSecrets, FakeStore};
use nr_core::{
    Device, FakeClock, JobResult, ResultMap, RunId, RunRecord, ServiceDefinition, Settings,
};
use serde_json::Value;
use std::sync::Arc;

/// Parent runtime used by every harness run.
pub(crate) const RT: &str = "rt-main";

pub(crate) struct Harness {
    pub engine: Arc<Engine>,
    pub store: FakeStore,
    pub evaluator: FakeEvaluator,
    pub connector: FakeConnector,
    pub clock: FakeClock,
    pub mail: FakeNotifier,
    pub chat: FakeNotifier,
    pub webhook: FakeNotifier,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self::build(settings, None)
    }

    /// Harness whose engine keeps run state in a fake KV service.
    pub fn with_kv(kv: nr_state::FakeKv) -> Self {
        Self::build(Settings::default(), Some(kv))
    }

    fn build(settings: Settings, kv: Option<nr_state::FakeKv>) -> Self {
        let store = FakeStore::new();
        let evaluator = FakeEvaluator::new();
        let connector = FakeConnector::new();
        let clock = FakeClock::new();
        let mail = FakeNotifier::new();
        let chat = FakeNotifier::new();
        let webhook = FakeNotifier::new();
        let deps = EngineDeps {
            store: Arc::new(store.clone()),
            evaluator: Arc::new(evaluator.clone()),
            connector: Arc::new(connector.clone()),
            secrets: Arc::new(FakeSecrets),
            mail: Arc::new(mail.clone()),
            chat: Arc::new(chat.clone()),
            webhook: Arc::new(webhook.clone()),
            clock: Arc::new(clock.clone()),
        };
        let engine = match kv {
            Some(kv) => Engine::with_kv(deps, settings, Arc::new(kv)),
            None => Engine::new(deps, settings),
        };
        store.add_run(RunRecord::new(RunId::random(), RT, "svc-root", "admin"));
        Self {
            engine,
            store,
            evaluator,
            connector,
            clock,
            mail,
            chat,
            webhook,
        }
    }

    /// Register devices in the store and return them.
    pub fn add_devices(&self, names: &[&str]) -> Vec<Device> {
        names
            .iter()
            .map(|name| {
                let device = Device::test(name);
                self.store.add_device(device.clone());
                device
            })
            .collect()
    }

    /// Run a service as the main run of the harness runtime.
    pub async fn run_service(
        &self,
        definition: ServiceDefinition,
        job: Arc<dyn ServiceJob>,
        targets: Vec<Device>,
    ) -> ResultMap {
        let spawn = RunnerSpawn {
            target_devices: targets,
            ..RunnerSpawn::main(Service::new(definition, job), RT)
        };
        let results = Runner::run(Arc::clone(&self.engine), spawn).await;
        results.unwrap_or_else(|e| panic!("run failed: {e}"))
    }

    /// Construct (but do not run) a main runner, for component-level tests.
    pub async fn runner(
        &self,
        definition: ServiceDefinition,
        job: Arc<dyn ServiceJob>,
        targets: Vec<Device>,
    ) -> Arc<Runner> {
        let spawn = RunnerSpawn {
            target_devices: targets.clone(),
            ..RunnerSpawn::main(Service::new(definition, job), RT)
        };
        let runner = Runner::init(Arc::clone(&self.engine), spawn).await;
        let runner = runner.unwrap_or_else(|e| panic!("runner init failed: {e}"));
        runner.set_targets(targets);
        runner
    }

    /// Integer leaf from the run's progress state.
    pub async fn state_i64(&self, path: &str, subpath: &str) -> i64 {
        self.engine
            .state()
            .read(RT, path, subpath)
            .await
            .ok()
            .flatten()
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }
}

/// A job body returning `{success: true, result}`.
pub(crate) fn ok_job(result: &'static str) -> Arc<dyn ServiceJob> {
    Arc::new(FnJob(move |_: Option<&Device>| Ok(job_result(true, result))))
}

/// A job body returning `{success: false, result}`.
pub(crate) fn failing_job(result: &'static str) -> Arc<dyn ServiceJob> {
    Arc::new(FnJob(move |_: Option<&Device>| Ok(job_result(false, result))))
}

pub(crate) fn job_result(success: bool, result: &str) -> JobResult {
    let mut map = JobResult::new();
    map.insert("success".to_string(), success.into());
    map.insert("result".to_string(), result.into());
    map
}

/// Definition with sane test defaults.
pub(crate) fn definition(id: &str) -> ServiceDefinition {
    ServiceDefinition::new(id, format!("service {id}"))
}

pub(crate) fn summary_names(results: &ResultMap, key: &str) -> Vec<String> {
    results
        .get("summary")
        .and_then(|s| s.get(key))
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
