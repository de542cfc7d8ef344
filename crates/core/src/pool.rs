// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device pools

use crate::device::Device;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a device pool.
    pub struct PoolId;
}

/// A named, possibly computed, set of devices.
///
/// Membership is materialized; refreshing it goes through
/// `ObjectStore::compute_pool`, which re-evaluates the pool's criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub name: String,
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl Pool {
    pub fn new(id: impl Into<PoolId>, name: impl Into<String>, devices: Vec<Device>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            devices,
        }
    }
}
