// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SMTP notification transport

use super::{Notification, NotifyError, NotifyTransport};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use nr_core::settings::MailSettings;

/// Sends notifications through an SMTP relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl SmtpNotifier {
    pub fn new(settings: &MailSettings) -> Result<Self, NotifyError> {
        if settings.server.is_empty() {
            return Err(NotifyError::NotConfigured("mail.server".to_string()));
        }
        let builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
                .map_err(|e| NotifyError::NotConfigured(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.server)
        };
        Ok(Self {
            transport: builder.port(settings.port).build(),
            sender: settings.sender.clone(),
        })
    }

    fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
        address
            .parse()
            .map_err(|_| NotifyError::SendFailed(format!("invalid address: {address}")))
    }
}

#[async_trait]
impl NotifyTransport for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<String, NotifyError> {
        let mut builder = Message::builder()
            .from(Self::mailbox(&self.sender)?)
            .subject(notification.subject.clone());
        let mut recipients = 0;
        for address in notification
            .recipient
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            builder = builder.to(Self::mailbox(address)?);
            recipients += 1;
        }
        if recipients == 0 {
            return Err(NotifyError::NotConfigured("mail recipient".to_string()));
        }
        if let Some(reply_to) = &notification.reply_to {
            builder = builder.reply_to(Self::mailbox(reply_to)?);
        }

        let message = match &notification.attachment {
            Some(attachment) => builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(notification.body.clone()))
                    .singlepart(
                        MailAttachment::new(attachment.filename.clone())
                            .body(attachment.content.clone(), ContentType::TEXT_PLAIN),
                    ),
            ),
            None => builder.body(notification.body.clone()),
        }
        .map_err(|e| NotifyError::SendFailed(e.to_string()))?;

        tracing::info!(subject = %notification.subject, "sending mail notification");
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        Ok(format!("{:?}", response.code()))
    }
}

#[cfg(test)]
#[path = "mail_tests.rs"]
mod tests;
