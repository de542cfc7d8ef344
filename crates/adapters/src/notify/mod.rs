// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification transports

mod chat;
mod mail;
mod noop;
mod webhook;

pub use chat::ChatNotifier;
pub use mail::SmtpNotifier;
pub use noop::NoOpNotifier;
pub use webhook::WebhookNotifier;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotifier;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notification sends
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport not configured: {0}")]
    NotConfigured(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// A file attached to an email notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content: String,
}

/// One formatted notification, ready for any backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    /// Comma-separated recipients (email backend)
    pub recipient: String,
    pub reply_to: Option<String>,
    /// Destination channel (chat and webhook backends)
    pub channel: String,
    pub attachment: Option<Attachment>,
}

/// Adapter for delivering run notifications.
#[async_trait]
pub trait NotifyTransport: Send + Sync {
    /// Deliver the notification; returns the transport's response text.
    async fn send(&self, notification: &Notification) -> Result<String, NotifyError>;
}
