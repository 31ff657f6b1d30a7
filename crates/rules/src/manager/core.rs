//! [`RuleManager`]: evaluates observations against the active rule set.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use chrono::{DateTime, FixedOffset, Local, Utc};
use parking_lot::Mutex;
use stormwatch_core::{Config, Observation};
use stormwatch_notify::dispatcher::DEFAULT_CHANNEL_TIMEOUT;
use stormwatch_notify::{AlarmContext, ChannelBinding, ChannelResult, Dispatcher};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::expression::{Condition, EvalError};
use crate::loader::{AlarmConfig, ConfigError, ConfigSource};
use crate::scheduler::{self, Location};
use crate::schema::RuleDefinition;
use crate::state::{RuleState, RuleStateStore};
use crate::validation::ValidationError;

use super::status::RuleStatus;

pub(super) struct CompiledRule {
    pub def: RuleDefinition,
    pub condition: Condition,
}

/// An immutable configuration snapshot; replaced whole on reload.
pub(super) struct ActiveConfig {
    pub rules: Vec<CompiledRule>,
    pub dispatcher: Arc<Dispatcher>,
    pub source: Option<ConfigSource>,
    pub loaded_at: DateTime<Utc>,
}

impl ActiveConfig {
    fn build(
        config: AlarmConfig,
        settings: &Config,
        channel_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(config.alarms.len());
        let mut channels = HashMap::with_capacity(config.alarms.len());
        for (i, def) in config.alarms.into_iter().enumerate() {
            let condition = Condition::parse(&def.condition).map_err(|e| {
                ConfigError::Validation(vec![ValidationError {
                    path: format!("alarms[{i}].condition"),
                    message: format!("Invalid condition: {e}"),
                    suggestion: None,
                }])
            })?;
            let bindings = def
                .channels
                .iter()
                .map(|c| ChannelBinding::from_config_lenient(c, def.template.as_deref(), settings))
                .collect::<Vec<_>>();
            channels.insert(def.name.clone(), bindings);
            rules.push(CompiledRule { def, condition });
        }
        Ok(Self {
            rules,
            dispatcher: Arc::new(Dispatcher::new(channels).with_timeout(channel_timeout)),
            source: config.source,
            loaded_at: Utc::now(),
        })
    }
}

/// Delivery of one fired rule, running on a background task.
#[derive(Debug)]
pub struct DispatchHandle {
    pub rule: String,
    handle: JoinHandle<Vec<ChannelResult>>,
}

impl DispatchHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for every channel of this dispatch to finish.
    pub async fn wait(self) -> Vec<ChannelResult> {
        match self.handle.await {
            Ok(results) => results,
            Err(e) => {
                warn!(rule = %self.rule, error = %e, "dispatch task failed");
                Vec::new()
            }
        }
    }
}

/// What one observation did to the rule set.
#[derive(Debug, Default)]
pub struct ProcessReport {
    pub fired: Vec<String>,
    /// Rules whose condition held but were inside their cooldown.
    pub suppressed: Vec<String>,
    pub errors: Vec<(String, EvalError)>,
    pub dispatches: Vec<DispatchHandle>,
}

impl ProcessReport {
    /// Wait for all dispatches started by this observation.
    pub async fn wait(self) -> Vec<(String, Vec<ChannelResult>)> {
        let mut out = Vec::with_capacity(self.dispatches.len());
        for dispatch in self.dispatches {
            let rule = dispatch.rule.clone();
            out.push((rule, dispatch.wait().await));
        }
        out
    }
}

enum Outcome {
    Skipped,
    Quiet,
    Error(EvalError),
    Suppressed,
    Fire(Box<AlarmContext>),
}

/// Owns the active rule set and all rule state.
///
/// Observations are evaluated sequentially. Each fire hands delivery to a
/// background task; deliveries for the same rule run one after another in
/// fire order, different rules deliver concurrently.
///
/// Lock order: `states` before `gates`. The active configuration is only
/// swapped while `states` is held, so a tick never mixes two rule sets.
pub struct RuleManager {
    active: ArcSwap<ActiveConfig>,
    states: Arc<Mutex<RuleStateStore>>,
    /// Completion signal of the most recent dispatch per rule.
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    settings: Arc<Config>,
    channel_timeout: Duration,
    started: Instant,
}

impl RuleManager {
    pub fn new(config: AlarmConfig, settings: Config) -> Result<Self, ConfigError> {
        Self::with_channel_timeout(config, settings, DEFAULT_CHANNEL_TIMEOUT)
    }

    pub fn with_channel_timeout(
        config: AlarmConfig,
        settings: Config,
        channel_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let active = ActiveConfig::build(config, &settings, channel_timeout)?;
        let mut states = RuleStateStore::new();
        for rule in &active.rules {
            states.get_or_create(&rule.def.name);
        }
        let manager = Self {
            active: ArcSwap::from_pointee(active),
            states: Arc::new(Mutex::new(states)),
            gates: Mutex::new(HashMap::new()),
            settings: Arc::new(settings),
            channel_timeout,
            started: Instant::now(),
        };
        manager.log_rules();
        Ok(manager)
    }

    /// Load `source` and build a manager from it.
    pub fn from_source(source: ConfigSource, settings: Config) -> Result<Self, ConfigError> {
        Self::new(AlarmConfig::load(source)?, settings)
    }

    fn log_rules(&self) {
        let active = self.active.load();
        for rule in active.rules.iter().filter(|r| r.def.enabled) {
            info!(
                rule = %rule.def.name,
                condition = %rule.condition,
                cooldown = rule.def.cooldown,
                channels = rule.def.channels.len(),
                "active alarm"
            );
        }
        info!(
            enabled = self.enabled_count(),
            total = active.rules.len(),
            "alarm manager ready"
        );
    }

    pub fn settings(&self) -> &Config {
        &self.settings
    }

    pub fn alarm_count(&self) -> usize {
        self.active.load().rules.len()
    }

    pub fn enabled_count(&self) -> usize {
        self.active.load().rules.iter().filter(|r| r.def.enabled).count()
    }

    /// File the active configuration was loaded from, if any.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.active
            .load()
            .source
            .as_ref()
            .and_then(|s| s.path())
            .map(PathBuf::from)
    }

    pub fn last_load_time(&self) -> DateTime<Utc> {
        self.active.load().loaded_at
    }

    pub fn rules(&self) -> Vec<RuleDefinition> {
        self.active.load().rules.iter().map(|r| r.def.clone()).collect()
    }

    pub fn state_snapshot(&self, rule: &str) -> Option<RuleState> {
        self.states.lock().get(rule).cloned()
    }

    fn local_time(&self, obs: &Observation) -> DateTime<FixedOffset> {
        match self
            .settings
            .station
            .utc_offset_minutes
            .and_then(|m| FixedOffset::east_opt(m * 60))
        {
            Some(offset) => obs.timestamp.with_timezone(&offset),
            None => obs.timestamp.with_timezone(&Local).fixed_offset(),
        }
    }

    fn context(
        &self,
        rule: &CompiledRule,
        obs: &Observation,
        state: &RuleState,
        local_time: DateTime<FixedOffset>,
    ) -> AlarmContext {
        AlarmContext {
            alarm: rule.def.summary(),
            station: self.settings.station.name.clone(),
            observation: obs.clone(),
            previous: state.previous.clone(),
            trigger_snapshot: state.trigger_snapshot.clone(),
            local_time,
            uptime: self.started.elapsed(),
        }
    }

    fn step(
        &self,
        states: &mut RuleStateStore,
        rule: &CompiledRule,
        obs: &Observation,
        local_time: DateTime<FixedOffset>,
        station: Option<Location>,
    ) -> Outcome {
        let name = rule.def.name.as_str();
        if !rule.def.enabled {
            return Outcome::Skipped;
        }
        if !scheduler::is_active(rule.def.schedule.as_ref(), &local_time, station) {
            debug!(rule = %name, "outside schedule");
            return Outcome::Skipped;
        }

        let state = states.get_or_create(name);
        match rule.condition.evaluate(obs, &*state) {
            Err(e) => Outcome::Error(e),
            Ok(false) => Outcome::Quiet,
            Ok(true) => {
                let remaining = state.cooldown_remaining(rule.def.cooldown_duration(), obs.timestamp);
                if !remaining.is_zero() {
                    debug!(rule = %name, remaining_secs = remaining.as_secs(), "in cooldown");
                    return Outcome::Suppressed;
                }
                let ctx = self.context(rule, obs, state, local_time);
                states.record_trigger(name, obs, obs.timestamp);
                Outcome::Fire(Box::new(ctx))
            }
        }
    }

    /// Evaluate every rule against `obs` and start delivery for those that
    /// fire.
    ///
    /// Cooldowns are measured on observation timestamps. Must be called
    /// from within a tokio runtime.
    pub fn process_observation(&self, obs: &Observation) -> ProcessReport {
        let local_time = self.local_time(obs);
        let station = self.settings.station.location().map(Location::from);
        let mut report = ProcessReport::default();

        // Held for the whole tick; `install` swaps the rule set under it.
        let mut states = self.states.lock();
        let active = self.active.load_full();
        for rule in &active.rules {
            let name = &rule.def.name;
            let outcome = self.step(&mut states, rule, obs, local_time, station);
            for field in rule.condition.referenced_fields() {
                states.set_previous(name, *field, obs.get(*field));
            }

            match outcome {
                Outcome::Skipped | Outcome::Quiet => {}
                Outcome::Error(e) => {
                    warn!(rule = %name, error = %e, "condition evaluation failed");
                    report.errors.push((name.clone(), e));
                }
                Outcome::Suppressed => report.suppressed.push(name.clone()),
                Outcome::Fire(ctx) => {
                    info!(rule = %name, condition = %rule.condition, "alarm triggered");
                    report.fired.push(name.clone());
                    report.dispatches.push(DispatchHandle {
                        rule: name.clone(),
                        handle: self.spawn_dispatch(Arc::clone(&active.dispatcher), name, *ctx),
                    });
                }
            }
        }
        report
    }

    /// Start delivery of one fire. It waits for the rule's previous
    /// dispatch, so deliveries keep fire order.
    fn spawn_dispatch(
        &self,
        dispatcher: Arc<Dispatcher>,
        rule: &str,
        ctx: AlarmContext,
    ) -> JoinHandle<Vec<ChannelResult>> {
        let (done, finished) = oneshot::channel();
        let previous = self.gates.lock().insert(rule.to_string(), finished);
        let states = Arc::clone(&self.states);
        let rule = rule.to_string();
        tokio::spawn(async move {
            if let Some(previous) = previous {
                // An error only means the earlier task is gone.
                let _ = previous.await;
            }
            let results = dispatcher.dispatch(&rule, &ctx).await;
            let _ = done.send(());
            let delivered = results.iter().filter(|r| r.success).count();
            if delivered > 0 {
                states.lock().record_delivery(&rule);
            }
            info!(
                rule = %rule,
                delivered,
                failed = results.len() - delivered,
                "alarm dispatched"
            );
            results
        })
    }

    /// Re-read the configuration file and activate it.
    ///
    /// On any error the active configuration and all state are untouched.
    pub fn reload(&self) -> Result<usize, ConfigError> {
        let source = match &self.active.load().source {
            Some(source @ ConfigSource::File(_)) => source.clone(),
            _ => return Err(ConfigError::NoSource),
        };
        let config = AlarmConfig::load(source)?;
        self.install(config)
    }

    /// Replace the rule set with `rules`, validated as a whole.
    ///
    /// The configuration file, if any, stays the reload source.
    pub fn replace_rules(&self, rules: Vec<RuleDefinition>) -> Result<usize, ConfigError> {
        let mut config = AlarmConfig::from_rules(rules)?;
        config.source = self.active.load().source.clone();
        self.install(config)
    }

    fn install(&self, config: AlarmConfig) -> Result<usize, ConfigError> {
        let next = ActiveConfig::build(config, &self.settings, self.channel_timeout)?;
        let count = next.rules.len();
        {
            let names: HashSet<&str> = next.rules.iter().map(|r| r.def.name.as_str()).collect();
            let mut states = self.states.lock();
            let dropped = states.retain(&names);
            for name in &names {
                states.get_or_create(name);
            }
            if !dropped.is_empty() {
                info!(?dropped, "discarded state of removed alarms");
            }
            self.gates.lock().retain(|name, _| names.contains(name.as_str()));
            self.active.store(Arc::new(next));
        }
        self.log_rules();
        Ok(count)
    }

    /// Status of every rule, cooldowns measured against the wall clock.
    pub fn status(&self) -> Vec<RuleStatus> {
        self.status_at(Utc::now())
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> Vec<RuleStatus> {
        let active = self.active.load();
        let states = self.states.lock();
        active
            .rules
            .iter()
            .map(|rule| RuleStatus::new(&rule.def, states.get(&rule.def.name), now))
            .collect()
    }
}
