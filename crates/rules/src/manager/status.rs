use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::schema::RuleDefinition;
use crate::state::RuleState;

/// Point-in-time view of one rule for status output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleStatus {
    pub name: String,
    pub enabled: bool,
    pub condition: String,
    pub tags: Vec<String>,
    pub channels: Vec<String>,
    pub schedule: String,
    /// RFC 3339 timestamp, or `"never"`.
    pub last_fired: String,
    pub cooldown_remaining_secs: u64,
    pub in_cooldown: bool,
    pub triggered_count: u64,
    pub delivered_count: u64,
}

impl RuleStatus {
    pub(super) fn new(def: &RuleDefinition, state: Option<&RuleState>, now: DateTime<Utc>) -> Self {
        let remaining = state
            .map(|s| s.cooldown_remaining(def.cooldown_duration(), now))
            .unwrap_or_default();
        // Round partial seconds up so a rule still in cooldown never shows 0.
        let remaining_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        Self {
            name: def.name.clone(),
            enabled: def.enabled,
            condition: def.condition.clone(),
            tags: def.tags.clone(),
            channels: def.channel_types(),
            schedule: def
                .schedule
                .as_ref()
                .map_or_else(|| "Always active (24/7)".to_string(), |s| s.describe()),
            last_fired: state
                .and_then(|s| s.last_fired)
                .map_or_else(|| "never".to_string(), |t| t.to_rfc3339()),
            cooldown_remaining_secs: remaining_secs,
            in_cooldown: !remaining.is_zero(),
            triggered_count: state.map_or(0, |s| s.triggered_count),
            delivered_count: state.map_or(0, |s| s.delivered_count),
        }
    }
}
