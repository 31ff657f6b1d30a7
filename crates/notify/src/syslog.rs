//! RFC 3164 syslog delivery over UDP, TCP, or the local socket.

use chrono::Local;
use stormwatch_core::config::SyslogConfig;
use tokio::io::AsyncWriteExt;

use crate::channel::SyslogSettings;
use crate::traits::{Notification, Notifier, NotifyError};

/// `user` facility.
const FACILITY_USER: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Transport {
    Local,
    Udp(String),
    Tcp(String),
}

#[derive(Debug)]
pub struct SyslogNotifier {
    transport: Transport,
    severity: u8,
    tag: String,
    hostname: String,
}

/// Map a severity name to its RFC 5424 numeric code.
pub fn severity_code(name: &str) -> Option<u8> {
    match name.trim().to_lowercase().as_str() {
        "emerg" | "emergency" => Some(0),
        "alert" => Some(1),
        "crit" | "critical" => Some(2),
        "err" | "error" => Some(3),
        "warning" | "warn" => Some(4),
        "notice" => Some(5),
        "info" => Some(6),
        "debug" => Some(7),
        _ => None,
    }
}

impl SyslogNotifier {
    /// Environment settings win; inline channel settings fill the gaps.
    pub fn from_settings(
        env: &SyslogConfig,
        inline: Option<&SyslogSettings>,
    ) -> Result<Self, NotifyError> {
        let inline = inline.cloned().unwrap_or_default();
        let network = env.network.clone().or(inline.network);
        let address = env.address.clone().or(inline.address);
        let priority = env
            .priority
            .clone()
            .or(inline.priority)
            .unwrap_or_else(|| env.priority().to_string());
        let tag = env
            .tag
            .clone()
            .or(inline.tag)
            .unwrap_or_else(|| env.tag().to_string());

        let transport = match (network.as_deref(), address) {
            (_, None) => Transport::Local,
            (Some("tcp"), Some(addr)) => Transport::Tcp(addr),
            (None | Some("udp"), Some(addr)) => Transport::Udp(addr),
            (Some(other), Some(_)) => {
                return Err(NotifyError::Config(format!(
                    "unsupported syslog network: {other}"
                )))
            }
        };

        let severity = severity_code(&priority)
            .ok_or_else(|| NotifyError::Config(format!("unknown syslog priority: {priority}")))?;

        Ok(Self {
            transport,
            severity,
            tag,
            hostname: std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()),
        })
    }

    /// Local-socket notifier with the configured tag, used as a fallback
    /// by other channels.
    pub fn local(env: &SyslogConfig) -> Self {
        Self {
            transport: Transport::Local,
            severity: severity_code(env.priority()).unwrap_or(4),
            tag: env.tag().to_string(),
            hostname: std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()),
        }
    }

    fn format_line(&self, message: &str) -> String {
        let pri = FACILITY_USER * 8 + self.severity;
        let timestamp = Local::now().format("%b %e %H:%M:%S");
        let message = message.replace('\n', " ");
        format!(
            "<{pri}>{timestamp} {} {}[{}]: {message}",
            self.hostname,
            self.tag,
            std::process::id()
        )
    }

    #[cfg(unix)]
    async fn send_local(&self, line: &str) -> Result<(), NotifyError> {
        let socket = tokio::net::UnixDatagram::unbound()?;
        let path = ["/dev/log", "/var/run/syslog"]
            .into_iter()
            .find(|p| std::path::Path::new(p).exists())
            .ok_or_else(|| NotifyError::Config("no local syslog socket found".to_string()))?;
        socket.send_to(line.as_bytes(), path).await?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn send_local(&self, _line: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Unsupported(
            "local syslog requires a Unix socket; set SYSLOG_ADDRESS".to_string(),
        ))
    }
}

#[async_trait::async_trait]
impl Notifier for SyslogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let line = self.format_line(&notification.message);
        match &self.transport {
            Transport::Local => self.send_local(&line).await?,
            Transport::Udp(addr) => {
                let socket = tokio::net::UdpSocket::bind("0.0.0.0:0").await?;
                socket.send_to(line.as_bytes(), addr.as_str()).await?;
            }
            Transport::Tcp(addr) => {
                let mut stream = tokio::net::TcpStream::connect(addr.as_str()).await?;
                stream.write_all(line.as_bytes()).await?;
                stream.write_all(b"\n").await?;
                stream.flush().await?;
            }
        }
        tracing::debug!(tag = %self.tag, "syslog message sent");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "syslog"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notification(message: &str) -> Notification {
        Notification {
            alarm_name: "Gusts".into(),
            subject: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn severity_names() {
        assert_eq!(severity_code("warning"), Some(4));
        assert_eq!(severity_code("ERR"), Some(3));
        assert_eq!(severity_code("loud"), None);
    }

    #[test]
    fn env_address_wins_over_inline() {
        let env = SyslogConfig {
            network: Some("tcp".into()),
            address: Some("logs.example.com:514".into()),
            ..SyslogConfig::default()
        };
        let inline = SyslogSettings {
            address: Some("other:514".into()),
            ..SyslogSettings::default()
        };
        let n = SyslogNotifier::from_settings(&env, Some(&inline)).unwrap();
        assert_eq!(n.transport, Transport::Tcp("logs.example.com:514".into()));
    }

    #[test]
    fn rejects_unknown_network_and_priority() {
        let env = SyslogConfig {
            network: Some("sctp".into()),
            address: Some("x:514".into()),
            ..SyslogConfig::default()
        };
        assert!(SyslogNotifier::from_settings(&env, None).is_err());

        let env = SyslogConfig {
            priority: Some("shouty".into()),
            ..SyslogConfig::default()
        };
        assert!(SyslogNotifier::from_settings(&env, None).is_err());
    }

    #[test]
    fn line_has_priority_and_tag() {
        let n = SyslogNotifier::local(&SyslogConfig::default());
        let line = n.format_line("wind 20 m/s\nsecond line");
        assert!(line.starts_with("<12>"), "got: {line}");
        assert!(line.contains(" stormwatch["));
        assert!(line.ends_with("]: wind 20 m/s second line"));
    }

    #[tokio::test]
    async fn sends_udp_datagram() {
        let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap().to_string();
        let env = SyslogConfig {
            address: Some(addr),
            ..SyslogConfig::default()
        };
        let n = SyslogNotifier::from_settings(&env, None).unwrap();
        n.send(&notification("lightning nearby")).await.unwrap();

        let mut buf = [0u8; 512];
        let len = receiver.recv(&mut buf).await.unwrap();
        let text = String::from_utf8_lossy(&buf[..len]);
        assert!(text.ends_with("lightning nearby"), "got: {text}");
    }
}
