//! Per-rule evaluation state: previous values, cooldown, trigger snapshots.
//!
//! State lives only in memory. After a restart every change-detection rule
//! re-establishes its baseline on the first observation.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use stormwatch_core::{Field, Observation};
use tracing::warn;

/// Previous-value access used by change-detection terms.
pub trait RuleStateView {
    fn previous(&self, field: Field) -> Option<f64>;
}

impl RuleStateView for HashMap<Field, f64> {
    fn previous(&self, field: Field) -> Option<f64> {
        self.get(&field).copied()
    }
}

/// State of a single rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleState {
    pub previous: HashMap<Field, f64>,
    /// Observation values captured the last time the rule fired.
    pub trigger_snapshot: HashMap<Field, f64>,
    pub last_fired: Option<DateTime<Utc>>,
    pub triggered_count: u64,
    /// Fires where at least one channel delivered.
    pub delivered_count: u64,
}

impl RuleStateView for RuleState {
    fn previous(&self, field: Field) -> Option<f64> {
        self.previous.get(&field).copied()
    }
}

impl RuleState {
    /// `max(0, cooldown - (now - last_fired))`; zero when the rule never
    /// fired or has no cooldown.
    pub fn cooldown_remaining(&self, cooldown: Duration, now: DateTime<Utc>) -> Duration {
        let Some(last_fired) = self.last_fired else {
            return Duration::ZERO;
        };
        if cooldown.is_zero() {
            return Duration::ZERO;
        }
        // A clock that moved backwards counts as no time elapsed.
        let elapsed = (now - last_fired).to_std().unwrap_or(Duration::ZERO);
        cooldown.saturating_sub(elapsed)
    }
}

/// Rule states keyed by rule name.
#[derive(Debug, Default)]
pub struct RuleStateStore {
    states: HashMap<String, RuleState>,
}

impl RuleStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, rule: &str) -> Option<&RuleState> {
        self.states.get(rule)
    }

    pub fn get_or_create(&mut self, rule: &str) -> &mut RuleState {
        self.states.entry(rule.to_string()).or_default()
    }

    pub fn contains(&self, rule: &str) -> bool {
        self.states.contains_key(rule)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn previous(&self, rule: &str, field: Field) -> Option<f64> {
        self.states.get(rule)?.previous.get(&field).copied()
    }

    pub fn set_previous(&mut self, rule: &str, field: Field, value: f64) {
        self.get_or_create(rule).previous.insert(field, value);
    }

    pub fn trigger_value(&self, rule: &str, field: Field) -> Option<f64> {
        self.states.get(rule)?.trigger_snapshot.get(&field).copied()
    }

    /// Record a fire: snapshot every field, stamp `last_fired`, count it.
    ///
    /// A rule without state gets fresh state.
    pub fn record_trigger(&mut self, rule: &str, observation: &Observation, now: DateTime<Utc>) {
        if !self.states.contains_key(rule) {
            warn!(rule, "recording trigger for unregistered rule, starting fresh state");
        }
        let state = self.get_or_create(rule);
        state.trigger_snapshot = observation.values();
        state.last_fired = Some(now);
        state.triggered_count += 1;
    }

    pub fn record_delivery(&mut self, rule: &str) {
        if let Some(state) = self.states.get_mut(rule) {
            state.delivered_count += 1;
        }
    }

    pub fn cooldown_remaining(&self, rule: &str, cooldown: Duration, now: DateTime<Utc>) -> Duration {
        self.states
            .get(rule)
            .map(|s| s.cooldown_remaining(cooldown, now))
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_in_cooldown(&self, rule: &str, cooldown: Duration, now: DateTime<Utc>) -> bool {
        !self.cooldown_remaining(rule, cooldown, now).is_zero()
    }

    /// Drop state for rules not in `names`. Returns the removed names.
    pub fn retain(&mut self, names: &HashSet<&str>) -> Vec<String> {
        let removed: Vec<String> = self
            .states
            .keys()
            .filter(|k| !names.contains(k.as_str()))
            .cloned()
            .collect();
        for name in &removed {
            self.states.remove(name);
        }
        removed
    }
}
