// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op notification transport

use super::{Notification, NotifyError, NotifyTransport};
use async_trait::async_trait;

/// Discards notifications. Used when a backend is intentionally disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpNotifier;

#[async_trait]
impl NotifyTransport for NoOpNotifier {
    async fn send(&self, notification: &Notification) -> Result<String, NotifyError> {
        tracing::debug!(subject = %notification.subject, "discarding notification (noop transport)");
        Ok(String::new())
    }
}
