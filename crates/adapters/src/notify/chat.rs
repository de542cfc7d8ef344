// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat-bot notification transport
//!
//! Posts to the chat service's message API with a bot token taken from the
//! environment at construction time.

use super::{Notification, NotifyError, NotifyTransport};
use async_trait::async_trait;
use nr_core::settings::ChatSettings;
use serde_json::json;

pub struct ChatNotifier {
    client: reqwest::Client,
    api_url: String,
    default_channel: String,
    token: Option<String>,
}

impl ChatNotifier {
    pub fn new(settings: &ChatSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: settings.api_url.clone(),
            default_channel: settings.channel.clone(),
            token: std::env::var(&settings.token_env).ok(),
        }
    }
}

#[async_trait]
impl NotifyTransport for ChatNotifier {
    async fn send(&self, notification: &Notification) -> Result<String, NotifyError> {
        if self.api_url.is_empty() {
            return Err(NotifyError::NotConfigured("chat.api_url".to_string()));
        }
        let channel = if notification.channel.is_empty() {
            self.default_channel.clone()
        } else {
            notification.channel.clone()
        };
        let mut request = self.client.post(&self.api_url).json(&json!({
            "channel": channel.as_str(),
            "text": notification.body,
        }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        tracing::info!(channel = %channel, "sending chat notification");
        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NotifyError::SendFailed(format!(
                "chat API returned {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))
    }
}

#[cfg(test)]
#[path = "chat_tests.rs"]
mod tests;
