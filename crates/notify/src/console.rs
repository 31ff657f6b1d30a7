//! Writes rendered alarms to standard output.

use tokio::io::AsyncWriteExt;

use crate::traits::{Notification, Notifier, NotifyError};

#[derive(Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait::async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut line = notification.message.clone();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        let mut stdout = tokio::io::stdout();
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "console"
    }
}
