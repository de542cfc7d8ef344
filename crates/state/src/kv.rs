// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! String-keyed KV service interface (redis-shaped)

use async_trait::async_trait;
use thiserror::Error;

/// Errors from KV operations
#[derive(Debug, Error)]
pub enum KvError {
    #[error("kv backend error: {0}")]
    Backend(String),
    #[error("wrong value kind at {0}")]
    WrongKind(String),
}

/// External key-value service used for cluster-shared run state.
///
/// The shape mirrors the redis commands the engine relies on; a production
/// implementation wraps a redis client, tests use [`FakeKv`].
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn set(&self, key: &str, value: String) -> Result<(), KvError>;
    /// Prepend to the list at `key`, creating it if absent
    async fn lpush(&self, key: &str, value: String) -> Result<(), KvError>;
    /// Add `delta` to the integer at `key`, creating it at 0 if absent
    async fn incr(&self, key: &str, delta: i64) -> Result<i64, KvError>;
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    /// Full contents of the list at `key`; `None` if the key is not a list
    async fn lrange(&self, key: &str) -> Result<Option<Vec<String>>, KvError>;
    /// Keys matching a `<prefix>*` pattern
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, KvError>;
    async fn delete(&self, keys: &[String]) -> Result<(), KvError>;
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeKv;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{KvError, KvStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    enum Slot {
        Str(String),
        Int(i64),
        List(Vec<String>),
    }

    /// In-memory KV store with redis semantics, for tests.
    #[derive(Clone, Default)]
    pub struct FakeKv {
        slots: Arc<Mutex<HashMap<String, Slot>>>,
    }

    impl FakeKv {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of live keys.
        pub fn len(&self) -> usize {
            self.slots.lock().len()
        }

        pub fn is_empty(&self) -> bool {
            self.slots.lock().is_empty()
        }
    }

    #[async_trait]
    impl KvStore for FakeKv {
        async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
            self.slots.lock().insert(key.to_string(), Slot::Str(value));
            Ok(())
        }

        async fn lpush(&self, key: &str, value: String) -> Result<(), KvError> {
            let mut slots = self.slots.lock();
            match slots
                .entry(key.to_string())
                .or_insert_with(|| Slot::List(Vec::new()))
            {
                Slot::List(items) => {
                    items.insert(0, value);
                    Ok(())
                }
                _ => Err(KvError::WrongKind(key.to_string())),
            }
        }

        async fn incr(&self, key: &str, delta: i64) -> Result<i64, KvError> {
            let mut slots = self.slots.lock();
            let slot = slots.entry(key.to_string()).or_insert(Slot::Int(0));
            match slot {
                Slot::Int(n) => {
                    *n += delta;
                    Ok(*n)
                }
                Slot::Str(s) => {
                    // redis INCR accepts string-encoded integers
                    let n = s
                        .parse::<i64>()
                        .map_err(|_| KvError::WrongKind(key.to_string()))?
                        + delta;
                    *slot = Slot::Int(n);
                    Ok(n)
                }
                Slot::List(_) => Err(KvError::WrongKind(key.to_string())),
            }
        }

        async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
            match self.slots.lock().get(key) {
                Some(Slot::Str(s)) => Ok(Some(s.clone())),
                Some(Slot::Int(n)) => Ok(Some(n.to_string())),
                Some(Slot::List(_)) => Err(KvError::WrongKind(key.to_string())),
                None => Ok(None),
            }
        }

        async fn lrange(&self, key: &str) -> Result<Option<Vec<String>>, KvError> {
            match self.slots.lock().get(key) {
                Some(Slot::List(items)) => Ok(Some(items.clone())),
                _ => Ok(None),
            }
        }

        async fn keys(&self, pattern: &str) -> Result<Vec<String>, KvError> {
            let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
            Ok(self
                .slots
                .lock()
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        }

        async fn delete(&self, keys: &[String]) -> Result<(), KvError> {
            let mut slots = self.slots.lock();
            for key in keys {
                slots.remove(key);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
