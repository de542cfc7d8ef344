// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine: everything shared across runs
//!
//! Replaces process-wide registries with one owned value passed into every
//! runner: the run registry, stop flags, per-run target ACLs, per-service
//! active-run counters, service log queues, the state store, and the
//! connection cache.

use crate::connections::ConnectionCache;
use nr_adapters::{Connector, Evaluator, NotifyTransport, ObjectStore, SecretStore};
use nr_core::{runtime_stamp, Clock, DeviceId, ServiceId, Settings};
use nr_state::{KvStore, StateStore};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Adapter handles the engine hands to its runners.
pub struct EngineDeps {
    pub store: Arc<dyn ObjectStore>,
    pub evaluator: Arc<dyn Evaluator>,
    pub connector: Arc<dyn Connector>,
    pub secrets: Arc<dyn SecretStore>,
    pub mail: Arc<dyn NotifyTransport>,
    pub chat: Arc<dyn NotifyTransport>,
    pub webhook: Arc<dyn NotifyTransport>,
    pub clock: Arc<dyn Clock>,
}

/// Registry entry for a live runner.
#[derive(Debug, Clone)]
pub struct RunEntry {
    pub path: String,
    pub service_id: ServiceId,
}

/// Shared engine state. One per process (or one per test).
pub struct Engine {
    pub(crate) deps: EngineDeps,
    settings: Settings,
    state: StateStore,
    connections: ConnectionCache,
    kv: Option<Arc<dyn KvStore>>,
    run_registry: Mutex<HashMap<String, RunEntry>>,
    stop_flags: Mutex<HashSet<String>>,
    run_targets: Mutex<HashMap<String, HashSet<DeviceId>>>,
    service_run_count: Mutex<HashMap<ServiceId, u32>>,
    log_queues: Mutex<HashMap<String, Vec<(ServiceId, String)>>>,
    runtime_seq: AtomicU64,
}

impl Engine {
    /// Engine with in-process run state.
    pub fn new(deps: EngineDeps, settings: Settings) -> Arc<Self> {
        Arc::new(Self {
            deps,
            settings,
            state: StateStore::in_memory(),
            connections: ConnectionCache::default(),
            kv: None,
            run_registry: Mutex::new(HashMap::new()),
            stop_flags: Mutex::new(HashSet::new()),
            run_targets: Mutex::new(HashMap::new()),
            service_run_count: Mutex::new(HashMap::new()),
            log_queues: Mutex::new(HashMap::new()),
            runtime_seq: AtomicU64::new(1),
        })
    }

    /// Engine with cluster-shared run state in an external KV service.
    pub fn with_kv(deps: EngineDeps, settings: Settings, kv: Arc<dyn KvStore>) -> Arc<Self> {
        Arc::new(Self {
            deps,
            settings,
            state: StateStore::with_kv(Arc::clone(&kv)),
            connections: ConnectionCache::default(),
            kv: Some(kv),
            run_registry: Mutex::new(HashMap::new()),
            stop_flags: Mutex::new(HashSet::new()),
            run_targets: Mutex::new(HashMap::new()),
            service_run_count: Mutex::new(HashMap::new()),
            log_queues: Mutex::new(HashMap::new()),
            runtime_seq: AtomicU64::new(1),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn connections(&self) -> &ConnectionCache {
        &self.connections
    }

    /// Unique, monotonically increasing runtime string.
    pub fn issue_runtime(&self) -> String {
        let seq = self.runtime_seq.fetch_add(1, Ordering::SeqCst);
        runtime_stamp(self.deps.clock.epoch_ms(), seq)
    }

    /// Request cancellation of a run tree.
    pub async fn request_stop(&self, parent_runtime: &str) {
        if let Some(kv) = &self.kv {
            if let Err(e) = kv.set(&format!("stop/{parent_runtime}"), "true".to_string()).await {
                tracing::error!(parent_runtime, error = %e, "failed to set stop flag");
            }
        } else {
            self.stop_flags.lock().insert(parent_runtime.to_string());
        }
    }

    /// Whether cancellation has been requested for a run tree.
    pub async fn stop_requested(&self, parent_runtime: &str) -> bool {
        if let Some(kv) = &self.kv {
            matches!(kv.get(&format!("stop/{parent_runtime}")).await, Ok(Some(_)))
        } else {
            self.stop_flags.lock().contains(parent_runtime)
        }
    }

    /// Limit the devices a run may target. Without a restriction every
    /// device is allowed.
    pub fn restrict_targets(
        &self,
        parent_runtime: &str,
        allowed: impl IntoIterator<Item = DeviceId>,
    ) {
        self.run_targets
            .lock()
            .insert(parent_runtime.to_string(), allowed.into_iter().collect());
    }

    pub(crate) fn allowed_target(&self, parent_runtime: &str, device: &DeviceId) -> bool {
        self.run_targets
            .lock()
            .get(parent_runtime)
            .map(|set| set.contains(device))
            .unwrap_or(true)
    }

    pub(crate) fn register_run(&self, runtime: &str, entry: RunEntry) {
        self.run_registry.lock().insert(runtime.to_string(), entry);
    }

    pub(crate) fn unregister_run(&self, runtime: &str) {
        self.run_registry.lock().remove(runtime);
    }

    /// Runtimes of currently registered runners.
    pub fn active_runs(&self) -> Vec<String> {
        self.run_registry.lock().keys().cloned().collect()
    }

    /// Paths of currently registered runners.
    pub fn active_paths(&self) -> Vec<String> {
        self.run_registry
            .lock()
            .values()
            .map(|e| e.path.clone())
            .collect()
    }

    pub(crate) fn service_started(&self, id: &ServiceId) -> u32 {
        let mut counts = self.service_run_count.lock();
        let count = counts.entry(id.clone()).or_insert(0);
        *count += 1;
        *count
    }

    pub(crate) fn service_finished(&self, id: &ServiceId) -> u32 {
        let mut counts = self.service_run_count.lock();
        let count = counts.entry(id.clone()).or_insert(1);
        *count = count.saturating_sub(1);
        *count
    }

    pub(crate) fn queue_log(&self, parent_runtime: &str, service: &ServiceId, line: String) {
        self.log_queues
            .lock()
            .entry(parent_runtime.to_string())
            .or_default()
            .push((service.clone(), line));
    }

    /// Take all queued log lines for a run, grouped by service.
    pub(crate) fn drain_logs(&self, parent_runtime: &str) -> Vec<(ServiceId, Vec<String>)> {
        let lines = self
            .log_queues
            .lock()
            .remove(parent_runtime)
            .unwrap_or_default();
        let mut grouped: Vec<(ServiceId, Vec<String>)> = Vec::new();
        for (service, line) in lines {
            match grouped.iter_mut().find(|(id, _)| *id == service) {
                Some((_, bucket)) => bucket.push(line),
                None => grouped.push((service, vec![line])),
            }
        }
        grouped
    }

    /// Drop the run's KV keys after the main run finishes. In-process state
    /// is kept for later inspection.
    pub(crate) async fn clear_shared_state(&self, parent_runtime: &str) {
        if self.kv.is_some() {
            if let Err(e) = self.state.clear(parent_runtime).await {
                tracing::error!(parent_runtime, error = %e, "failed to clear run state");
            }
        }
        self.stop_flags.lock().remove(parent_runtime);
        self.run_targets.lock().remove(parent_runtime);
    }
}
