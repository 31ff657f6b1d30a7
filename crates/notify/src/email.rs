//! SMTP email notifier via `lettre` with TLS support.
//!
//! Delivers notifications as emails through an SMTP server.
//! Supports STARTTLS and implicit TLS connections.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use stormwatch_core::config::SmtpConfig;

use crate::channel::EmailSettings;
use crate::traits::{Notification, Notifier, NotifyError};

/// Sends notifications as emails via SMTP.
#[derive(Debug)]
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    html: bool,
}

fn parse_mailboxes(addrs: &[String]) -> Result<Vec<Mailbox>, NotifyError> {
    addrs
        .iter()
        .map(|addr| {
            addr.parse()
                .map_err(|e: lettre::address::AddressError| {
                    NotifyError::Config(format!("invalid address '{addr}': {e}"))
                })
        })
        .collect()
}

impl EmailNotifier {
    /// Build an `EmailNotifier` from a channel's settings and the SMTP
    /// environment.
    ///
    /// Server, port, sender and credentials come from the environment when
    /// `SMTP_HOST` is set; otherwise the channel's inline `smtp_host`,
    /// `smtp_port` and `from` are used. Port 465 uses implicit TLS; other
    /// ports use STARTTLS unless TLS is disabled.
    pub fn from_settings(email: &EmailSettings, smtp: &SmtpConfig) -> Result<Self, NotifyError> {
        let (host, port) = match (&smtp.host, &email.smtp_host) {
            (Some(host), _) => (host.clone(), smtp.port),
            (None, Some(host)) => (host.clone(), email.smtp_port.unwrap_or(smtp.port)),
            (None, None) => {
                return Err(NotifyError::Config(
                    "SMTP_HOST is not configured".to_string(),
                ))
            }
        };

        let from = smtp
            .from_mailbox()
            .or_else(|| email.from.clone())
            .ok_or_else(|| NotifyError::Config("no sender address configured".to_string()))?;
        let from: Mailbox = from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let to = parse_mailboxes(&email.to)?;
        if to.is_empty() {
            return Err(NotifyError::Config(
                "at least one recipient is required".to_string(),
            ));
        }

        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else if smtp.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&host).port(port)
        };

        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
            cc: parse_mailboxes(&email.cc)?,
            bcc: parse_mailboxes(&email.bcc)?,
            html: email.html,
        })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let mut builder = Message::builder().from(self.from.clone());
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        for recipient in &self.cc {
            builder = builder.cc(recipient.clone());
        }
        for recipient in &self.bcc {
            builder = builder.bcc(recipient.clone());
        }

        let subject = notification
            .subject
            .clone()
            .unwrap_or_else(|| format!("Weather alarm: {}", notification.alarm_name));
        let content_type = if self.html {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        builder
            .subject(subject)
            .header(content_type)
            .body(notification.message.clone())
            .map_err(|e| NotifyError::Smtp(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    /// Send a notification email to all configured recipients.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let email = self.build_message(notification)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            alarm = %notification.alarm_name,
            recipients = self.to.len() + self.cc.len() + self.bcc.len(),
            "notification delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}
