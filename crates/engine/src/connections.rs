// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-scoped device connection cache
//!
//! Sessions are keyed by `(family, parent_runtime, device, connection_name)`
//! so distinct logical connections to the same device never collide. An
//! entry exists only while the session is believed alive: every cache hit is
//! preceded by the family's liveness probe, and a failed probe closes and
//! evicts the entry before the caller reopens.

use nr_adapters::{DeviceSession, ProtocolFamily};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Cache key for one logical connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub family: ProtocolFamily,
    pub parent_runtime: String,
    pub device: String,
    pub name: String,
}

impl ConnectionKey {
    pub fn new(
        family: ProtocolFamily,
        parent_runtime: impl Into<String>,
        device: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            family,
            parent_runtime: parent_runtime.into(),
            device: device.into(),
            name: name.into(),
        }
    }
}

/// Per-run cache of open device sessions.
#[derive(Default)]
pub struct ConnectionCache {
    entries: Mutex<HashMap<ConnectionKey, Arc<dyn DeviceSession>>>,
}

impl ConnectionCache {
    /// Cached session for the key, liveness-checked.
    ///
    /// With `start_new` the entry is unconditionally closed first. A dead
    /// entry is closed and removed; either way the caller then opens a fresh
    /// session and [`put`](Self::put)s it.
    pub async fn get(&self, key: &ConnectionKey, start_new: bool) -> Option<Arc<dyn DeviceSession>> {
        let session = self.entries.lock().get(key).cloned()?;
        if start_new {
            self.close_entry(key, &session).await;
            return None;
        }
        if session.is_alive().await {
            Some(session)
        } else {
            tracing::info!(device = %key.device, family = %key.family, "cached connection failed liveness probe");
            self.close_entry(key, &session).await;
            None
        }
    }

    pub fn put(&self, key: ConnectionKey, session: Arc<dyn DeviceSession>) {
        self.entries.lock().insert(key, session);
    }

    /// Close and remove one entry, if present.
    pub async fn evict(&self, key: &ConnectionKey) {
        let session = self.entries.lock().remove(key);
        if let Some(session) = session {
            if let Err(e) = session.close().await {
                tracing::error!(device = %key.device, family = %key.family, error = %e, "error while closing connection");
            } else {
                tracing::info!(device = %key.device, family = %key.family, name = %key.name, "closed connection");
            }
        }
    }

    /// Close every connection a run holds to one device, across all
    /// families and connection names.
    pub async fn close_device(&self, parent_runtime: &str, device: &str) {
        let keys: Vec<ConnectionKey> = self
            .entries
            .lock()
            .keys()
            .filter(|k| k.parent_runtime == parent_runtime && k.device == device)
            .cloned()
            .collect();
        for key in keys {
            self.evict(&key).await;
        }
    }

    /// Close every connection a run holds, one worker per entry, and wait
    /// for completion. Close errors are logged, never raised.
    pub async fn close_all(&self, parent_runtime: &str) {
        let entries: Vec<(ConnectionKey, Arc<dyn DeviceSession>)> = {
            let mut guard = self.entries.lock();
            let keys: Vec<ConnectionKey> = guard
                .keys()
                .filter(|k| k.parent_runtime == parent_runtime)
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|k| guard.remove(&k).map(|s| (k, s)))
                .collect()
        };
        let mut workers = JoinSet::new();
        for (key, session) in entries {
            workers.spawn(async move {
                if let Err(e) = session.close().await {
                    tracing::error!(device = %key.device, family = %key.family, error = %e, "error while closing connection");
                }
            });
        }
        while workers.join_next().await.is_some() {}
    }

    /// Number of live entries for a run.
    pub fn count(&self, parent_runtime: &str) -> usize {
        self.entries
            .lock()
            .keys()
            .filter(|k| k.parent_runtime == parent_runtime)
            .count()
    }

    async fn close_entry(&self, key: &ConnectionKey, session: &Arc<dyn DeviceSession>) {
        self.entries.lock().remove(key);
        if let Err(e) = session.close().await {
            tracing::error!(device = %key.device, family = %key.family, error = %e, "error while closing connection");
        }
    }
}

#[cfg(test)]
#[path = "connections_tests.rs"]
mod tests;
