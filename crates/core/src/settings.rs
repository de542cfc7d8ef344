// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine settings, loaded from TOML

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Base address used to assemble result links in notifications
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailSettings {
    #[serde(default)]
    pub server: String,
    #[serde(default = "default_mail_port")]
    pub port: u16,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub use_tls: bool,
}

fn default_mail_port() -> u16 {
    587
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: default_mail_port(),
            sender: String::new(),
            use_tls: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Chat-bot API endpoint for posting messages
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub channel: String,
    /// Environment variable holding the bot token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "CHAT_BOT_TOKEN".to_string()
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            channel: String::new(),
            token_env: default_token_env(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default = "default_true")]
    pub verify_certificate: bool,
}

fn default_true() -> bool {
    true
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            channel: String::new(),
            verify_certificate: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecuritySettings {
    /// Module names the expression sandbox must refuse to import
    #[serde(default)]
    pub forbidden_imports: Vec<String>,
    /// Model names each store helper may touch, keyed by operation
    /// (`fetch`, `fetch_all`, `factory`, `delete`)
    #[serde(default)]
    pub allowed_models: IndexMap<String, Vec<String>>,
}

impl SecuritySettings {
    /// Whether `operation` is allowed to touch `model`.
    pub fn allows(&self, operation: &str, model: &str) -> bool {
        self.allowed_models
            .get(operation)
            .map(|models| models.iter().any(|m| m == model))
            .unwrap_or(false)
    }
}

/// Engine-wide configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub mail: MailSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub webhook: WebhookSettings,
    #[serde(default)]
    pub security: SecuritySettings,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text)?)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
