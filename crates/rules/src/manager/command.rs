//! Control loop: observations, reloads and admin requests arrive as
//! messages, so a reload always lands between two observations.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use stormwatch_core::Observation;

use crate::loader::{ConfigError, ConfigWatcher, DEFAULT_DEBOUNCE};
use crate::schema::RuleDefinition;

use super::core::{DispatchHandle, RuleManager};
use super::status::RuleStatus;

const COMMAND_BUFFER: usize = 256;

#[derive(Debug)]
pub enum ManagerCommand {
    Observation(Observation),
    /// Re-read the configuration file.
    Reload,
    ReplaceRules {
        rules: Vec<RuleDefinition>,
        reply: oneshot::Sender<Result<usize, ConfigError>>,
    },
    Status(oneshot::Sender<Vec<RuleStatus>>),
    /// Stop after waiting for in-flight deliveries.
    Shutdown,
}

/// Cloneable sender side of a running manager.
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    tx: mpsc::Sender<ManagerCommand>,
}

impl ManagerHandle {
    async fn send(&self, command: ManagerCommand) -> Result<(), ConfigError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| ConfigError::ManagerStopped)
    }

    pub async fn observe(&self, observation: Observation) -> Result<(), ConfigError> {
        self.send(ManagerCommand::Observation(observation)).await
    }

    pub async fn reload(&self) -> Result<(), ConfigError> {
        self.send(ManagerCommand::Reload).await
    }

    pub async fn replace_rules(&self, rules: Vec<RuleDefinition>) -> Result<usize, ConfigError> {
        let (reply, rx) = oneshot::channel();
        self.send(ManagerCommand::ReplaceRules { rules, reply }).await?;
        rx.await.map_err(|_| ConfigError::ManagerStopped)?
    }

    pub async fn status(&self) -> Result<Vec<RuleStatus>, ConfigError> {
        let (reply, rx) = oneshot::channel();
        self.send(ManagerCommand::Status(reply)).await?;
        rx.await.map_err(|_| ConfigError::ManagerStopped)
    }

    pub async fn shutdown(&self) -> Result<(), ConfigError> {
        self.send(ManagerCommand::Shutdown).await
    }
}

impl RuleManager {
    /// Move the manager onto a control-loop task.
    ///
    /// With `watch`, a file-backed configuration is reloaded whenever the
    /// file changes. The task ends on [`ManagerCommand::Shutdown`] or when
    /// every handle is dropped, and returns the manager.
    pub fn spawn(self, watch: bool) -> (ManagerHandle, JoinHandle<RuleManager>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let watcher = if watch { self.start_watcher(&tx) } else { None };
        let task = tokio::spawn(run_loop(self, rx, watcher));
        (ManagerHandle { tx }, task)
    }

    fn start_watcher(&self, tx: &mpsc::Sender<ManagerCommand>) -> Option<ConfigWatcher> {
        let path = self.config_path()?;
        let weak = tx.downgrade();
        let on_change = move || {
            let Some(tx) = weak.upgrade() else {
                return;
            };
            if tx.try_send(ManagerCommand::Reload).is_err() {
                debug!("command queue full, dropping reload request");
            }
        };
        match ConfigWatcher::spawn(&path, DEFAULT_DEBOUNCE, on_change) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                // Non-fatal: the manager runs without hot-reload.
                error!(path = %path.display(), error = %e, "failed to watch alarm config");
                None
            }
        }
    }
}

async fn run_loop(
    manager: RuleManager,
    mut rx: mpsc::Receiver<ManagerCommand>,
    _watcher: Option<ConfigWatcher>,
) -> RuleManager {
    let mut pending: Vec<DispatchHandle> = Vec::new();

    while let Some(command) = rx.recv().await {
        pending.retain(|d| !d.is_finished());
        match command {
            ManagerCommand::Observation(observation) => {
                let report = manager.process_observation(&observation);
                pending.extend(report.dispatches);
            }
            ManagerCommand::Reload => match manager.reload() {
                Ok(count) => info!(alarms = count, "alarm config reloaded"),
                Err(e) => error!(error = %e, "alarm config reload failed, keeping previous config"),
            },
            ManagerCommand::ReplaceRules { rules, reply } => {
                let result = manager.replace_rules(rules);
                if let Err(e) = &result {
                    warn!(error = %e, "rule replacement rejected");
                }
                let _ = reply.send(result);
            }
            ManagerCommand::Status(reply) => {
                let _ = reply.send(manager.status());
            }
            ManagerCommand::Shutdown => break,
        }
    }

    if !pending.is_empty() {
        info!(count = pending.len(), "waiting for in-flight notifications");
    }
    for dispatch in pending {
        dispatch.wait().await;
    }
    info!("alarm manager stopped");
    manager
}
