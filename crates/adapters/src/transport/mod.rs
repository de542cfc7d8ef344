// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device-protocol transport interface
//!
//! Drivers themselves are external collaborators; the engine sees a uniform
//! open/liveness/send/close contract. Each transport family maps its native
//! liveness probe behind [`DeviceSession::is_alive`]:
//!
//! - CLI-automation: `find_prompt`, any error means dead
//! - Streaming-CLI: `get_prompt`, any error means dead
//! - Vendor-agnostic management: the driver's own `is_alive`
//! - NETCONF: the `connected` flag

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeConnector, FakeSession};

use async_trait::async_trait;
use nr_core::{Device, ResolvedCredential};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {device} failed: {message}")]
    Connect { device: String, message: String },
    #[error("send on {device} failed: {message}")]
    Send { device: String, message: String },
    #[error("close failed: {0}")]
    Close(String),
}

/// The four supported transport families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolFamily {
    CliAutomation,
    StreamingCli,
    VendorAgnostic,
    Netconf,
}

impl ProtocolFamily {
    pub const ALL: [ProtocolFamily; 4] = [
        ProtocolFamily::CliAutomation,
        ProtocolFamily::StreamingCli,
        ProtocolFamily::VendorAgnostic,
        ProtocolFamily::Netconf,
    ];

    /// The device's driver name for this family.
    pub fn driver_of<'a>(&self, device: &'a Device) -> &'a str {
        match self {
            ProtocolFamily::CliAutomation => &device.cli_driver,
            ProtocolFamily::StreamingCli => &device.streaming_driver,
            ProtocolFamily::VendorAgnostic => &device.agnostic_driver,
            ProtocolFamily::Netconf => &device.netconf_driver,
        }
    }
}

impl fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolFamily::CliAutomation => write!(f, "cli_automation"),
            ProtocolFamily::StreamingCli => write!(f, "streaming_cli"),
            ProtocolFamily::VendorAgnostic => write!(f, "vendor_agnostic"),
            ProtocolFamily::Netconf => write!(f, "netconf"),
        }
    }
}

/// Everything a connector needs to open a session.
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    pub family: ProtocolFamily,
    pub device: Device,
    /// Driver name, already resolved between the device's driver and a
    /// service-level override
    pub driver: String,
    pub credential: ResolvedCredential,
    pub timeout: Option<Duration>,
    /// Family-specific options (window sizes, transfer limits, ...),
    /// configured at construction and not enforced by the engine
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// An open session to one device.
///
/// A handle is exclusively owned by the worker currently using it; the
/// connection cache hands it to one worker at a time per connection name.
#[async_trait]
pub trait DeviceSession: Send + Sync {
    fn family(&self) -> ProtocolFamily;

    /// Family-specific liveness probe (see module docs). `false` means the
    /// session must be closed and reopened.
    async fn is_alive(&self) -> bool;

    /// Send a command and return the device's response.
    async fn send(&self, command: &str) -> Result<String, TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

/// Opens sessions; implemented per deployment over the installed drivers.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, spec: &ConnectionSpec) -> Result<Arc<dyn DeviceSession>, TransportError>;
}
