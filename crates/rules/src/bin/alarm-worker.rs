//! alarm-worker: evaluates weather observations against alarm rules.
//!
//! Reads one JSON observation per line from stdin, fires the matching
//! alarms, and reloads the alarm file when it changes. Prints the status
//! of every rule as JSON on shutdown.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use stormwatch_core::{config, Config, Observation};
use stormwatch_notify::dispatcher::DEFAULT_CHANNEL_TIMEOUT;
use stormwatch_rules::{AlarmConfig, ConfigSource, RuleManager};

// ── CLI ─────────────────────────────────────────────────────────────

/// Weather alarm worker.
#[derive(Parser, Debug)]
#[command(name = "alarm-worker", version, about)]
struct Cli {
    /// Alarm file (.json, .yml, .yaml). A leading '@' is accepted.
    #[arg(long, env = "ALARM_CONFIG", conflicts_with = "alarms_json")]
    alarms: Option<String>,

    /// Inline alarm configuration as JSON.
    #[arg(long)]
    alarms_json: Option<String>,

    /// Do not reload the alarm file when it changes.
    #[arg(long)]
    no_watch: bool,

    /// Per-channel delivery timeout in seconds.
    #[arg(long, env = "ALARM_CHANNEL_TIMEOUT", default_value_t = DEFAULT_CHANNEL_TIMEOUT.as_secs())]
    channel_timeout: u64,
}

impl Cli {
    fn source(&self) -> anyhow::Result<ConfigSource> {
        match (&self.alarms, &self.alarms_json) {
            (Some(path), _) => Ok(ConfigSource::File(
                path.strip_prefix('@').unwrap_or(path).into(),
            )),
            (None, Some(json)) => Ok(ConfigSource::from_arg(json)),
            (None, None) => anyhow::bail!("no alarm configuration: pass --alarms or --alarms-json"),
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    config::load_dotenv();
    let cli = Cli::parse();
    let settings = Config::from_env();
    settings.log_summary();

    let source = cli.source()?;
    let alarms = AlarmConfig::load(source.clone())
        .with_context(|| format!("loading alarm config from {source}"))?;
    let manager = RuleManager::with_channel_timeout(
        alarms,
        settings,
        Duration::from_secs(cli.channel_timeout),
    )?;
    let (handle, task) = manager.spawn(!cli.no_watch);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    info!("end of input");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Observation>(&line) {
                    Ok(observation) => handle.observe(observation).await?,
                    Err(e) => warn!(error = %e, "skipping malformed observation"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    handle.shutdown().await?;
    let manager = task.await.context("alarm manager task")?;
    println!("{}", serde_json::to_string_pretty(&manager.status())?);
    Ok(())
}
