// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nr_core::settings::MailSettings;

fn settings() -> MailSettings {
    MailSettings {
        server: "smtp.example.net".to_string(),
        port: 2525,
        sender: "runner@example.net".to_string(),
        use_tls: false,
    }
}

#[test]
fn rejects_missing_server() {
    let err = SmtpNotifier::new(&MailSettings::default());
    assert!(matches!(err, Err(NotifyError::NotConfigured(_))));
}

#[tokio::test]
async fn rejects_empty_recipient_before_connecting() {
    let notifier = SmtpNotifier::new(&settings()).unwrap();
    let err = notifier.send(&Notification::default()).await;
    assert!(matches!(err, Err(NotifyError::NotConfigured(_))));
}

#[tokio::test]
async fn rejects_malformed_recipient_before_connecting() {
    let notifier = SmtpNotifier::new(&settings()).unwrap();
    let notification = Notification {
        subject: "PASS: backup".to_string(),
        body: "ok".to_string(),
        recipient: "not an address".to_string(),
        ..Notification::default()
    };
    let err = notifier.send(&notification).await;
    assert!(matches!(err, Err(NotifyError::SendFailed(_))));
}
