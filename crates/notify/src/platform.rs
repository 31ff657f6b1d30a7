//! Platform log channels.
//!
//! `oslog` emits a structured event on the `stormwatch::oslog` tracing
//! target, which the host's subscriber routes to the unified log or
//! journal. `eventlog` does the same on `stormwatch::eventlog` and, on Unix,
//! also writes to the local syslog socket.

use stormwatch_core::config::SyslogConfig;

use crate::syslog::SyslogNotifier;
use crate::traits::{Notification, Notifier, NotifyError};

#[derive(Debug, Default)]
pub struct OsLogNotifier;

#[async_trait::async_trait]
impl Notifier for OsLogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::warn!(
            target: "stormwatch::oslog",
            alarm = %notification.alarm_name,
            "{}",
            notification.message
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "oslog"
    }
}

#[derive(Debug)]
pub struct EventLogNotifier {
    syslog: Option<SyslogNotifier>,
}

impl EventLogNotifier {
    pub fn new(settings: &SyslogConfig) -> Self {
        Self {
            syslog: cfg!(unix).then(|| SyslogNotifier::local(settings)),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for EventLogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::warn!(
            target: "stormwatch::eventlog",
            alarm = %notification.alarm_name,
            "{}",
            notification.message
        );
        if let Some(syslog) = &self.syslog {
            syslog.send(notification).await?;
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "eventlog"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn oslog_always_succeeds() {
        let n = OsLogNotifier;
        let notification = Notification {
            alarm_name: "UV".into(),
            subject: None,
            message: "UV index 9".into(),
            timestamp: Utc::now(),
        };
        assert!(n.send(&notification).await.is_ok());
        assert_eq!(n.channel_name(), "oslog");
    }

    #[test]
    fn eventlog_uses_syslog_on_unix() {
        let n = EventLogNotifier::new(&SyslogConfig::default());
        assert_eq!(n.syslog.is_some(), cfg!(unix));
    }
}
