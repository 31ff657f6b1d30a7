use std::env;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_opt(key) {
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

/// Parse an optional numeric setting, rejecting values outside `range`.
fn env_f64_in(
    key: &str,
    range: std::ops::RangeInclusive<f64>,
) -> Result<Option<f64>, CoreError> {
    let Some(raw) = env_opt(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if range.contains(&v) => Ok(Some(v)),
        _ => Err(CoreError::InvalidSetting {
            key: key.to_string(),
            value: raw,
        }),
    }
}

// ── Top-level config ──────────────────────────────────────────

/// Provider and station settings read from the environment.
///
/// Environment values take precedence over anything set inline in a
/// channel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub station: StationConfig,
    pub smtp: SmtpConfig,
    pub twilio: TwilioConfig,
    pub aws_sns: AwsSnsConfig,
    pub syslog: SyslogConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            station: StationConfig::from_env(),
            smtp: SmtpConfig::from_env(),
            twilio: TwilioConfig::from_env(),
            aws_sns: AwsSnsConfig::from_env(),
            syslog: SyslogConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  station:  name={}, location={}",
            self.station.name,
            match self.station.location() {
                Some((lat, lon)) => format!("{lat:.4},{lon:.4}"),
                None => "(none)".to_string(),
            }
        );
        tracing::info!(
            "  smtp:     host={}, port={}",
            self.smtp.host.as_deref().unwrap_or("(none)"),
            self.smtp.port
        );
        tracing::info!("  twilio:   configured={}", self.twilio.is_configured());
        tracing::info!("  aws_sns:  configured={}", self.aws_sns.is_configured());
        tracing::info!(
            "  syslog:   address={}, tag={}",
            self.syslog.address.as_deref().unwrap_or("(local)"),
            self.syslog.tag()
        );
    }

    /// Return a redacted view safe for status output (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "station": {
                "name": self.station.name,
                "latitude": self.station.latitude,
                "longitude": self.station.longitude,
            },
            "smtp": {
                "host": self.smtp.host,
                "port": self.smtp.port,
                "from": self.smtp.from_address,
                "configured": self.smtp.is_configured(),
            },
            "twilio": { "configured": self.twilio.is_configured() },
            "aws_sns": { "region": self.aws_sns.region, "configured": self.aws_sns.is_configured() },
            "syslog": {
                "network": self.syslog.network,
                "address": self.syslog.address,
                "priority": self.syslog.priority(),
                "tag": self.syslog.tag(),
            },
        })
    }
}

// ── Station ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Fixed UTC offset in minutes for schedule evaluation; `None` uses the host zone.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            name: "Weather Station".to_string(),
            latitude: None,
            longitude: None,
            utc_offset_minutes: None,
        }
    }
}

impl StationConfig {
    fn from_env() -> Self {
        let latitude = env_f64_in("STATION_LATITUDE", -90.0..=90.0).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring station latitude");
            None
        });
        let longitude = env_f64_in("STATION_LONGITUDE", -180.0..=180.0).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring station longitude");
            None
        });
        Self {
            name: env_or("STATION_NAME", "Weather Station"),
            latitude,
            longitude,
            utc_offset_minutes: env_opt("STATION_UTC_OFFSET_MINUTES").and_then(|v| v.parse().ok()),
        }
    }

    /// Latitude and longitude when both are known.
    pub fn location(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

// ── SMTP ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: Option<String>,
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            username: None,
            password: None,
            from_address: None,
            from_name: None,
            use_tls: true,
        }
    }
}

impl SmtpConfig {
    fn from_env() -> Self {
        Self {
            host: env_opt("SMTP_HOST"),
            port: env_u16("SMTP_PORT", 587),
            username: env_opt("SMTP_USERNAME"),
            password: env_opt("SMTP_PASSWORD"),
            from_address: env_opt("SMTP_FROM_ADDRESS"),
            from_name: env_opt("SMTP_FROM_NAME"),
            use_tls: env_bool("SMTP_USE_TLS", true),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.host.is_some() && self.from_address.is_some()
    }

    /// Sender as `Name <address>` when a display name is set.
    pub fn from_mailbox(&self) -> Option<String> {
        let address = self.from_address.as_deref()?;
        Some(match self.from_name.as_deref() {
            Some(name) => format!("{name} <{address}>"),
            None => address.to_string(),
        })
    }
}

// ── Twilio (SMS) ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

impl TwilioConfig {
    fn from_env() -> Self {
        Self {
            account_sid: env_opt("TWILIO_ACCOUNT_SID"),
            auth_token: env_opt("TWILIO_AUTH_TOKEN"),
            from_number: env_opt("TWILIO_FROM_NUMBER"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from_number.is_some()
    }
}

// ── AWS SNS (SMS) ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsSnsConfig {
    pub access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
    pub region: String,
    pub topic_arn: Option<String>,
}

impl Default for AwsSnsConfig {
    fn default() -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            region: "us-east-1".to_string(),
            topic_arn: None,
        }
    }
}

impl AwsSnsConfig {
    fn from_env() -> Self {
        Self {
            access_key_id: env_opt("AWS_ACCESS_KEY_ID"),
            secret_access_key: env_opt("AWS_SECRET_ACCESS_KEY"),
            region: env_or("AWS_REGION", "us-east-1"),
            topic_arn: env_opt("AWS_SNS_TOPIC_ARN"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

// ── Syslog ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyslogConfig {
    /// `udp`, `tcp`, or unset for the local socket.
    pub network: Option<String>,
    /// `host:port` of a remote collector.
    pub address: Option<String>,
    /// Severity name (`emerg` .. `debug`).
    pub priority: Option<String>,
    pub tag: Option<String>,
}

impl SyslogConfig {
    fn from_env() -> Self {
        Self {
            network: env_opt("SYSLOG_NETWORK"),
            address: env_opt("SYSLOG_ADDRESS"),
            priority: env_opt("SYSLOG_PRIORITY"),
            tag: env_opt("SYSLOG_TAG"),
        }
    }

    pub fn priority(&self) -> &str {
        self.priority.as_deref().unwrap_or("warning")
    }

    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or("stormwatch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_f64_in_rejects_out_of_range() {
        env::set_var("SW_TEST_LAT_BAD", "123.0");
        let err = env_f64_in("SW_TEST_LAT_BAD", -90.0..=90.0).unwrap_err();
        assert!(err.to_string().contains("SW_TEST_LAT_BAD"));
        env::remove_var("SW_TEST_LAT_BAD");
    }

    #[test]
    fn env_f64_in_accepts_valid_and_missing() {
        env::set_var("SW_TEST_LAT_OK", " -33.86 ");
        assert_eq!(env_f64_in("SW_TEST_LAT_OK", -90.0..=90.0).unwrap(), Some(-33.86));
        env::remove_var("SW_TEST_LAT_OK");
        assert_eq!(env_f64_in("SW_TEST_LAT_UNSET_XYZ", -90.0..=90.0).unwrap(), None);
    }

    #[test]
    fn env_bool_parses_common_spellings() {
        env::set_var("SW_TEST_BOOL", "Yes");
        assert!(env_bool("SW_TEST_BOOL", false));
        env::set_var("SW_TEST_BOOL", "off");
        assert!(!env_bool("SW_TEST_BOOL", true));
        env::remove_var("SW_TEST_BOOL");
        assert!(env_bool("SW_TEST_BOOL", true));
    }

    #[test]
    fn smtp_from_mailbox_includes_display_name() {
        let smtp = SmtpConfig {
            from_address: Some("alerts@example.com".into()),
            from_name: Some("Weather Alerts".into()),
            ..SmtpConfig::default()
        };
        assert_eq!(
            smtp.from_mailbox().as_deref(),
            Some("Weather Alerts <alerts@example.com>")
        );
    }

    #[test]
    fn redacted_summary_omits_secrets() {
        let mut config = Config::default();
        config.smtp.password = Some("hunter2".into());
        config.twilio.auth_token = Some("tok".into());
        let text = config.redacted_summary().to_string();
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("tok\""));
    }

    #[test]
    fn station_location_requires_both_coordinates() {
        let mut station = StationConfig::default();
        station.latitude = Some(40.0);
        assert_eq!(station.location(), None);
        station.longitude = Some(-105.0);
        assert_eq!(station.location(), Some((40.0, -105.0)));
    }
}
