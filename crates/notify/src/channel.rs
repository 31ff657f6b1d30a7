//! Channel configuration as it appears in alarm files, and construction of
//! the matching [`Notifier`].

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stormwatch_core::Config;

use crate::console::ConsoleNotifier;
use crate::email::EmailNotifier;
use crate::file::{CsvFileNotifier, JsonFileNotifier};
use crate::platform::{EventLogNotifier, OsLogNotifier};
use crate::sms::SmsNotifier;
use crate::syslog::SyslogNotifier;
use crate::traits::{Notifier, NotifyError, UnavailableNotifier};
use crate::webhook::WebhookNotifier;

/// Channel type names accepted in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Console,
    Syslog,
    Oslog,
    Eventlog,
    Email,
    Sms,
    Webhook,
    Csv,
    Json,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 9] = [
        ChannelKind::Console,
        ChannelKind::Syslog,
        ChannelKind::Oslog,
        ChannelKind::Eventlog,
        ChannelKind::Email,
        ChannelKind::Sms,
        ChannelKind::Webhook,
        ChannelKind::Csv,
        ChannelKind::Json,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Console => "console",
            ChannelKind::Syslog => "syslog",
            ChannelKind::Oslog => "oslog",
            ChannelKind::Eventlog => "eventlog",
            ChannelKind::Email => "email",
            ChannelKind::Sms => "sms",
            ChannelKind::Webhook => "webhook",
            ChannelKind::Csv => "csv",
            ChannelKind::Json => "json",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailSettings {
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub html: bool,
    /// Inline SMTP settings, used only where the environment has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmsSettings {
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

fn default_max_days() -> u32 {
    30
}

/// Append-only log file with age-based rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSettings {
    pub path: PathBuf,
    /// Rotate the file once it is older than this many days; 0 disables rotation.
    #[serde(default = "default_max_days")]
    pub max_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Inline syslog overrides; environment settings take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyslogSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// One notification channel attached to a rule.
///
/// Serialized with a `type` tag, e.g.
/// `{"type": "email", "email": {"to": ["ops@example.com"], "subject": "..."}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelConfig {
    Console {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
    Syslog {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        syslog: Option<SyslogSettings>,
    },
    Oslog {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
    Eventlog {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
    Email {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        email: EmailSettings,
    },
    Sms {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        sms: SmsSettings,
    },
    Webhook {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        webhook: WebhookSettings,
    },
    Csv {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        csv: FileSettings,
    },
    Json {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        json: FileSettings,
    },
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|t| !t.trim().is_empty())
}

impl ChannelConfig {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelConfig::Console { .. } => ChannelKind::Console,
            ChannelConfig::Syslog { .. } => ChannelKind::Syslog,
            ChannelConfig::Oslog { .. } => ChannelKind::Oslog,
            ChannelConfig::Eventlog { .. } => ChannelKind::Eventlog,
            ChannelConfig::Email { .. } => ChannelKind::Email,
            ChannelConfig::Sms { .. } => ChannelKind::Sms,
            ChannelConfig::Webhook { .. } => ChannelKind::Webhook,
            ChannelConfig::Csv { .. } => ChannelKind::Csv,
            ChannelConfig::Json { .. } => ChannelKind::Json,
        }
    }

    /// The channel-level `template` override.
    pub fn template(&self) -> Option<&str> {
        match self {
            ChannelConfig::Console { template }
            | ChannelConfig::Syslog { template, .. }
            | ChannelConfig::Oslog { template }
            | ChannelConfig::Eventlog { template }
            | ChannelConfig::Email { template, .. }
            | ChannelConfig::Sms { template, .. }
            | ChannelConfig::Webhook { template, .. }
            | ChannelConfig::Csv { template, .. }
            | ChannelConfig::Json { template, .. } => non_empty(template),
        }
    }

    /// Template for the message body: the variant's own body field, then
    /// the channel template, then the rule-level default.
    pub fn message_template<'a>(&'a self, rule_default: Option<&'a str>) -> Option<&'a str> {
        let specific = match self {
            ChannelConfig::Email { email, .. } => non_empty(&email.body),
            ChannelConfig::Sms { sms, .. } => non_empty(&sms.message),
            ChannelConfig::Webhook { webhook, .. } => non_empty(&webhook.body),
            ChannelConfig::Csv { csv: file, .. } | ChannelConfig::Json { json: file, .. } => {
                non_empty(&file.message)
            }
            _ => None,
        };
        specific
            .or_else(|| self.template())
            .or(rule_default.filter(|t| !t.trim().is_empty()))
    }

    /// Subject line template, for channels that carry one.
    pub fn subject_template(&self) -> Option<&str> {
        match self {
            ChannelConfig::Email { email, .. } => non_empty(&email.subject),
            _ => None,
        }
    }

    /// Construct the notifier for this channel.
    pub fn build_notifier(&self, settings: &Config) -> Result<Arc<dyn Notifier>, NotifyError> {
        let notifier: Arc<dyn Notifier> = match self {
            ChannelConfig::Console { .. } => Arc::new(ConsoleNotifier),
            ChannelConfig::Syslog { syslog, .. } => Arc::new(SyslogNotifier::from_settings(
                &settings.syslog,
                syslog.as_ref(),
            )?),
            ChannelConfig::Oslog { .. } => Arc::new(OsLogNotifier),
            ChannelConfig::Eventlog { .. } => Arc::new(EventLogNotifier::new(&settings.syslog)),
            ChannelConfig::Email { email, .. } => {
                Arc::new(EmailNotifier::from_settings(email, &settings.smtp)?)
            }
            ChannelConfig::Sms { sms, .. } => Arc::new(SmsNotifier::from_settings(sms, settings)?),
            ChannelConfig::Webhook { webhook, .. } => Arc::new(WebhookNotifier::from_config(
                webhook.url.clone(),
                webhook.method.clone(),
                Some(webhook.headers.clone()),
                webhook.content_type.clone(),
            )?),
            ChannelConfig::Csv { csv, .. } => {
                Arc::new(CsvFileNotifier::new(csv.path.clone(), csv.max_days))
            }
            ChannelConfig::Json { json, .. } => {
                Arc::new(JsonFileNotifier::new(json.path.clone(), json.max_days))
            }
        };
        Ok(notifier)
    }

    /// Like [`build_notifier`](Self::build_notifier), but a construction
    /// failure yields a notifier that reports the failure on every send.
    pub fn build_notifier_or_unavailable(&self, settings: &Config) -> Arc<dyn Notifier> {
        match self.build_notifier(settings) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(channel = %self.kind(), error = %e, "channel unavailable");
                Arc::new(UnavailableNotifier::new(self.kind().as_str(), e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_json_channels() {
        let json = r#"[
            {"type": "console", "template": "{{alarm_name}}"},
            {"type": "email", "email": {"to": ["ops@example.com"], "subject": "S", "body": "B", "html": true}},
            {"type": "webhook", "webhook": {"url": "https://hooks.example.com/x", "body": "{}"}},
            {"type": "csv", "csv": {"path": "/tmp/alarms.csv"}}
        ]"#;
        let channels: Vec<ChannelConfig> = serde_json::from_str(json).unwrap();
        assert_eq!(channels.len(), 4);
        assert_eq!(channels[0].kind(), ChannelKind::Console);
        assert_eq!(channels[0].template(), Some("{{alarm_name}}"));
        match &channels[1] {
            ChannelConfig::Email { email, .. } => {
                assert!(email.html);
                assert_eq!(email.to, vec!["ops@example.com"]);
            }
            other => panic!("expected email, got {other:?}"),
        }
        match &channels[3] {
            ChannelConfig::Csv { csv, .. } => assert_eq!(csv.max_days, 30),
            other => panic!("expected csv, got {other:?}"),
        }
    }

    #[test]
    fn parses_yaml_channels() {
        let yaml = "- type: sms\n  sms:\n    to: ['+15550100']\n    message: '{{message}}'\n- type: oslog\n  template: hi\n";
        let channels: Vec<ChannelConfig> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(channels[0].kind(), ChannelKind::Sms);
        assert_eq!(channels[1].kind(), ChannelKind::Oslog);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<ChannelConfig, _> = serde_json::from_str(r#"{"type": "pager"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn message_template_precedence() {
        let email = ChannelConfig::Email {
            template: Some("channel".into()),
            email: EmailSettings {
                body: Some("body".into()),
                ..EmailSettings::default()
            },
        };
        assert_eq!(email.message_template(Some("rule")), Some("body"));

        let console = ChannelConfig::Console {
            template: Some("  ".into()),
        };
        assert_eq!(console.message_template(Some("rule")), Some("rule"));
        assert_eq!(console.message_template(None), None);

        let sms = ChannelConfig::Sms {
            template: Some("channel".into()),
            sms: SmsSettings::default(),
        };
        assert_eq!(sms.message_template(Some("rule")), Some("channel"));
    }

    #[test]
    fn build_failure_becomes_unavailable_notifier() {
        let channel = ChannelConfig::Webhook {
            template: None,
            webhook: WebhookSettings {
                url: "https://${STORMWATCH_DEFINITELY_UNSET}/hook".into(),
                ..WebhookSettings::default()
            },
        };
        let notifier = channel.build_notifier_or_unavailable(&Config::default());
        assert_eq!(notifier.channel_name(), "webhook");
    }
}
