// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nr-adapters: Trait seams between the engine and the outside world
//!
//! Each seam follows the same layout: the trait and its error type, real
//! implementations where a transport is plain HTTP or SMTP, and a
//! call-recording fake behind the `test-support` feature.

pub mod eval;
pub mod notify;
pub mod secrets;
pub mod store;
pub mod transport;

pub use eval::{EvalError, Evaluator, HelperHost, Scope};
pub use notify::{
    Attachment, ChatNotifier, NoOpNotifier, Notification, NotifyError, NotifyTransport,
    SmtpNotifier, WebhookNotifier,
};
pub use secrets::{PlainSecrets, SecretError, SecretStore};
pub use store::{Filters, ObjectStore, StoreError};
pub use transport::{
    ConnectionSpec, Connector, DeviceSession, ProtocolFamily, TransportError,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use eval::FakeEvaluator;
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifier;
#[cfg(any(test, feature = "test-support"))]
pub use secrets::FakeSecrets;
#[cfg(any(test, feature = "test-support"))]
pub use store::FakeStore;
#[cfg(any(test, feature = "test-support"))]
pub use transport::{FakeConnector, FakeSession};
