//! Rule definitions and the alarm file envelope.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use stormwatch_notify::{AlarmSummary, ChannelConfig};

use super::Schedule;

pub(crate) fn default_true() -> bool {
    true
}

/// One alarm rule as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds to suppress re-firing after a fire; 0 disables suppression.
    #[serde(default)]
    pub cooldown: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Message template for channels that have none of their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
}

impl RuleDefinition {
    /// A bare enabled rule with no channels.
    pub fn new(name: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            condition: condition.into(),
            enabled: true,
            cooldown: 0,
            tags: Vec::new(),
            template: None,
            channels: Vec::new(),
            schedule: None,
        }
    }

    pub fn cooldown_duration(&self) -> Duration {
        Duration::from_secs(self.cooldown)
    }

    pub fn summary(&self) -> AlarmSummary {
        AlarmSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            condition: self.condition.clone(),
            tags: self.tags.clone(),
            enabled: self.enabled,
            cooldown_secs: self.cooldown,
        }
    }

    pub fn channel_types(&self) -> Vec<String> {
        self.channels
            .iter()
            .map(|c| c.kind().as_str().to_string())
            .collect()
    }
}

/// Top-level alarm file: `{"alarms": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmFile {
    #[serde(default)]
    pub alarms: Vec<RuleDefinition>,
}
