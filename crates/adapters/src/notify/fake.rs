// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notification transport for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Notification, NotifyError, NotifyTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct FakeNotifierState {
    sent: Vec<Notification>,
    fail_next: bool,
}

/// Records every notification; can be told to fail the next send.
#[derive(Clone, Default)]
pub struct FakeNotifier {
    inner: Arc<Mutex<FakeNotifierState>>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self) {
        self.inner.lock().fail_next = true;
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.inner.lock().sent.clone()
    }
}

#[async_trait]
impl NotifyTransport for FakeNotifier {
    async fn send(&self, notification: &Notification) -> Result<String, NotifyError> {
        let mut inner = self.inner.lock();
        if inner.fail_next {
            inner.fail_next = false;
            return Err(NotifyError::SendFailed("injected send failure".to_string()));
        }
        inner.sent.push(notification.clone());
        Ok("ok".to_string())
    }
}
