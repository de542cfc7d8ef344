// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nr_core::settings::WebhookSettings;

#[tokio::test]
async fn unconfigured_url_is_an_error() {
    let notifier = WebhookNotifier::new(&WebhookSettings::default()).unwrap();
    let err = notifier.send(&Notification::default()).await;
    assert!(matches!(err, Err(NotifyError::NotConfigured(_))));
}

#[test]
fn builds_with_certificate_verification_disabled() {
    let settings = WebhookSettings {
        url: "https://hooks.example.net".to_string(),
        channel: "ops".to_string(),
        verify_certificate: false,
    };
    assert!(WebhookNotifier::new(&settings).is_ok());
}
