// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook notification transport

use super::{Notification, NotifyError, NotifyTransport};
use async_trait::async_trait;
use nr_core::settings::WebhookSettings;
use serde_json::json;

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    default_channel: String,
}

impl WebhookNotifier {
    pub fn new(settings: &WebhookSettings) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!settings.verify_certificate)
            .build()
            .map_err(|e| NotifyError::NotConfigured(e.to_string()))?;
        Ok(Self {
            client,
            url: settings.url.clone(),
            default_channel: settings.channel.clone(),
        })
    }
}

#[async_trait]
impl NotifyTransport for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<String, NotifyError> {
        if self.url.is_empty() {
            return Err(NotifyError::NotConfigured("webhook.url".to_string()));
        }
        let channel = if notification.channel.is_empty() {
            self.default_channel.clone()
        } else {
            notification.channel.clone()
        };
        tracing::info!(url = %self.url, "sending webhook notification");
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "channel": channel.as_str(),
                "text": notification.body,
            }))
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NotifyError::SendFailed(format!(
                "webhook returned {}",
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
#[path = "webhook_tests.rs"]
mod tests;
