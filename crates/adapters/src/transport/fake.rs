// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake transport for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ConnectionSpec, Connector, DeviceSession, ProtocolFamily, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Fake device session with scriptable liveness and responses.
pub struct FakeSession {
    pub device: String,
    family: ProtocolFamily,
    alive: AtomicBool,
    closed: AtomicBool,
    responses: Mutex<HashMap<String, String>>,
    sent: Mutex<Vec<String>>,
}

impl FakeSession {
    pub fn new(device: &str, family: ProtocolFamily) -> Arc<Self> {
        Arc::new(Self {
            device: device.to_string(),
            family,
            alive: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            responses: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Make the next liveness probe fail.
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn set_response(&self, command: &str, response: &str) {
        self.responses
            .lock()
            .insert(command.to_string(), response.to_string());
    }

    pub fn sent_commands(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl DeviceSession for FakeSession {
    fn family(&self) -> ProtocolFamily {
        self.family
    }

    async fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.closed.load(Ordering::SeqCst)
    }

    async fn send(&self, command: &str) -> Result<String, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Send {
                device: self.device.clone(),
                message: "session closed".to_string(),
            });
        }
        self.sent.lock().push(command.to_string());
        Ok(self
            .responses
            .lock()
            .get(command)
            .cloned()
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FakeConnectorState {
    opened: Vec<ConnectionSpec>,
    sessions: Vec<Arc<FakeSession>>,
    fail_devices: Vec<String>,
}

/// Fake connector: hands out [`FakeSession`]s and records every open.
#[derive(Clone, Default)]
pub struct FakeConnector {
    inner: Arc<Mutex<FakeConnectorState>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail opens against the named device.
    pub fn fail_device(&self, device: &str) {
        self.inner.lock().fail_devices.push(device.to_string());
    }

    pub fn opened(&self) -> Vec<ConnectionSpec> {
        self.inner.lock().opened.clone()
    }

    pub fn open_count(&self, device: &str) -> usize {
        self.inner
            .lock()
            .opened
            .iter()
            .filter(|spec| spec.device.name == device)
            .count()
    }

    pub fn sessions(&self) -> Vec<Arc<FakeSession>> {
        self.inner.lock().sessions.clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, spec: &ConnectionSpec) -> Result<Arc<dyn DeviceSession>, TransportError> {
        let mut inner = self.inner.lock();
        if inner.fail_devices.contains(&spec.device.name) {
            return Err(TransportError::Connect {
                device: spec.device.name.clone(),
                message: "injected connect failure".to_string(),
            });
        }
        inner.opened.push(spec.clone());
        let session = FakeSession::new(&spec.device.name, spec.family);
        inner.sessions.push(Arc::clone(&session));
        Ok(session)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
