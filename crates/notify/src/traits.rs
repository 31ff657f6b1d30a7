//! Notifier trait definition and shared error types.

use chrono::{DateTime, Utc};

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    /// Name of the rule that fired.
    pub alarm_name: String,
    /// Rendered subject line, for channels that have one.
    pub subject: Option<String>,
    /// Rendered message body.
    pub message: String,
    /// Observation time of the reading that fired the rule.
    pub timestamp: DateTime<Utc>,
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "webhook", "email").
    fn channel_name(&self) -> &str;
}

/// Result of delivering a notification to a single channel.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChannelResult {
    pub channel: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Notifier that fails every send with a fixed reason.
///
/// Installed when a channel cannot be constructed (missing provider
/// credentials, unparseable address) so sibling channels still deliver.
#[derive(Debug)]
pub struct UnavailableNotifier {
    name: String,
    reason: String,
}

impl UnavailableNotifier {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for UnavailableNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Config(self.reason.clone()))
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}
