//! Notification delivery for weather alarms.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - Console, syslog, platform log, email, SMS, webhook, CSV and JSON file channels
//! - Permissive `{{placeholder}}` template rendering backed by minijinja
//! - Dispatcher that delivers to every channel of a rule concurrently

pub mod channel;
pub mod console;
pub mod dispatcher;
pub mod email;
pub mod file;
pub mod format;
pub mod platform;
pub mod sms;
pub mod syslog;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use channel::{ChannelConfig, ChannelKind};
pub use dispatcher::{ChannelBinding, Dispatcher};
pub use templating::{AlarmContext, AlarmSummary, TemplateRenderer};
pub use traits::{ChannelResult, Notification, Notifier, NotifyError};

#[cfg(test)]
pub(crate) mod test_support {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::task::JoinHandle;

    /// Accept one HTTP request on a local port, answer with `status`, and
    /// return the raw request text.
    pub(crate) async fn http_stub(status: &'static str) -> (String, JoinHandle<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok"
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf).to_string()
        });
        (base, handle)
    }
}
