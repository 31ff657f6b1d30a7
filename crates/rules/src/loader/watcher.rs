//! Debounced file watcher for alarm config hot-reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::Result;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches one config file and calls back once per burst of changes.
///
/// The parent directory is watched rather than the file so that editors
/// which replace the file by rename are still seen. Dropping the watcher
/// stops it.
pub struct ConfigWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

fn is_relevant(event: &Event, file_name: &OsString) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    ) && event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

impl ConfigWatcher {
    /// Start watching `path`. Must be called inside a tokio runtime.
    pub fn spawn<F>(path: &Path, debounce: Duration, on_change: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let file_name = path.file_name().map(OsString::from).unwrap_or_default();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) if is_relevant(&event, &file_name) => {
                    let _ = tx.send(());
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "alarm config watcher error"),
            },
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let watched = path.to_path_buf();
        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // Trailing edge: wait for the burst to go quiet.
                loop {
                    match tokio::time::timeout(debounce, rx.recv()).await {
                        Ok(Some(())) => continue,
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }
                debug!(path = %watched.display(), "alarm config changed");
                on_change();
            }
        });

        info!(path = %path.display(), "watching alarm config for changes");
        Ok(Self {
            path: path.to_path_buf(),
            _watcher: watcher,
            task,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
