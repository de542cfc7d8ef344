// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nr_core::settings::ChatSettings;

#[tokio::test]
#[serial_test::serial]
async fn unconfigured_api_url_is_an_error() {
    let notifier = ChatNotifier::new(&ChatSettings::default());
    let err = notifier.send(&Notification::default()).await;
    assert!(matches!(err, Err(NotifyError::NotConfigured(_))));
}

#[test]
#[serial_test::serial]
fn token_comes_from_the_configured_env_var() {
    std::env::set_var("TEST_CHAT_TOKEN", "xoxb-123");
    let settings = ChatSettings {
        api_url: "https://chat.example.net/api".to_string(),
        channel: "#ops".to_string(),
        token_env: "TEST_CHAT_TOKEN".to_string(),
    };
    let notifier = ChatNotifier::new(&settings);
    assert_eq!(notifier.token.as_deref(), Some("xoxb-123"));
    std::env::remove_var("TEST_CHAT_TOKEN");

    let without = ChatNotifier::new(&settings);
    assert!(without.token.is_none());
}
