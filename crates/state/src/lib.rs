// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nr-state: Key-addressed run-state tree with in-memory and KV back-ends

pub mod kv;
pub mod state;

pub use kv::{KvError, KvStore};
pub use state::{StateError, StateStore, WriteMethod};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use kv::FakeKv;
