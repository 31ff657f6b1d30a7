//! CSV and JSON log-file channels with age-based rotation.
//!
//! When a log file's last modification is older than `max_days`, it is
//! renamed to `<path>.<YYYYmmddHHMMSS>.bak` and a fresh file is started.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::traits::{Notification, Notifier, NotifyError};

/// Serializes writers so concurrent dispatches never interleave rows.
static FILE_LOCK: Mutex<()> = parking_lot::const_mutex(());

const CSV_COLUMNS: [&str; 11] = [
    "timestamp",
    "alarm_name",
    "alarm_description",
    "temperature",
    "humidity",
    "pressure",
    "wind_speed",
    "lux",
    "uv",
    "rain_daily",
    "message",
];

/// Rotate `path` if it was last modified more than `max_days` before `now`.
///
/// Returns the backup path when a rotation happened.
pub fn rotate_if_expired(
    path: &Path,
    max_days: u32,
    now: DateTime<Utc>,
) -> io::Result<Option<PathBuf>> {
    if max_days == 0 {
        return Ok(None);
    }
    let modified = match fs::metadata(path) {
        Ok(meta) => meta.modified()?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let max_age = Duration::from_secs(u64::from(max_days) * 86_400);
    let now_system = SystemTime::from(now);
    let age = now_system.duration_since(modified).unwrap_or_default();
    if age <= max_age {
        return Ok(None);
    }

    let mut backup = path.as_os_str().to_owned();
    backup.push(format!(".{}.bak", now.format("%Y%m%d%H%M%S")));
    let backup = PathBuf::from(backup);
    fs::rename(path, &backup)?;
    tracing::info!(path = %path.display(), backup = %backup.display(), "rotated alarm log");
    Ok(Some(backup))
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_line(fields: &[&str]) -> String {
    let mut line = fields
        .iter()
        .map(|f| csv_escape(f))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

/// Append one row to a CSV log.
///
/// A message of exactly ten comma-separated values is spread across the
/// sensor columns; anything else is stored as a single `message` column.
pub fn append_csv(
    path: &Path,
    message: &str,
    max_days: u32,
    now: DateTime<Utc>,
) -> io::Result<()> {
    let _guard = FILE_LOCK.lock();
    rotate_if_expired(path, max_days, now)?;
    ensure_parent(path)?;

    let parts: Vec<&str> = message.split(',').map(str::trim).collect();
    let multi_column = parts.len() == CSV_COLUMNS.len() - 1;
    let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if is_new {
        let header: &[&str] = if multi_column {
            &CSV_COLUMNS
        } else {
            &["timestamp", "message"]
        };
        file.write_all(csv_line(header).as_bytes())?;
    }

    let timestamp = now.to_rfc3339();
    let mut row = vec![timestamp.as_str()];
    if multi_column {
        row.extend(parts.iter().copied());
    } else {
        row.push(message);
    }
    file.write_all(csv_line(&row).as_bytes())?;
    Ok(())
}

/// One entry in a JSON alarm log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRecord {
    pub timestamp: String,
    pub alarm: String,
    pub message: String,
}

/// Append a record to a JSON-array alarm log.
pub fn append_json(
    path: &Path,
    alarm: &str,
    message: &str,
    max_days: u32,
    now: DateTime<Utc>,
) -> io::Result<()> {
    let _guard = FILE_LOCK.lock();
    rotate_if_expired(path, max_days, now)?;
    ensure_parent(path)?;

    let mut records: Vec<JsonRecord> = match fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => {
            serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        }
        Ok(_) => Vec::new(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e),
    };
    records.push(JsonRecord {
        timestamp: now.to_rfc3339(),
        alarm: alarm.to_string(),
        message: message.to_string(),
    });

    let text = serde_json::to_string_pretty(&records)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

async fn run_blocking<F>(f: F) -> Result<(), NotifyError>
where
    F: FnOnce() -> io::Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| NotifyError::Io(io::Error::other(e)))??;
    Ok(())
}

#[derive(Debug)]
pub struct CsvFileNotifier {
    path: PathBuf,
    max_days: u32,
}

impl CsvFileNotifier {
    pub fn new(path: PathBuf, max_days: u32) -> Self {
        Self { path, max_days }
    }
}

#[async_trait::async_trait]
impl Notifier for CsvFileNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let path = self.path.clone();
        let max_days = self.max_days;
        let message = notification.message.clone();
        let now = notification.timestamp;
        run_blocking(move || append_csv(&path, &message, max_days, now)).await
    }

    fn channel_name(&self) -> &str {
        "csv"
    }
}

#[derive(Debug)]
pub struct JsonFileNotifier {
    path: PathBuf,
    max_days: u32,
}

impl JsonFileNotifier {
    pub fn new(path: PathBuf, max_days: u32) -> Self {
        Self { path, max_days }
    }
}

#[async_trait::async_trait]
impl Notifier for JsonFileNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let path = self.path.clone();
        let max_days = self.max_days;
        let alarm = notification.alarm_name.clone();
        let message = notification.message.clone();
        let now = notification.timestamp;
        run_blocking(move || append_json(&path, &alarm, &message, max_days, now)).await
    }

    fn channel_name(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    fn set_mtime(path: &Path, when: SystemTime) {
        let file = OpenOptions::new().append(true).open(path).unwrap();
        file.set_modified(when).unwrap();
    }

    #[test]
    fn csv_multi_column_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alarms.csv");
        let message = "High Temp,High temperature detected,30.5,75.0,1013.25,5.5,45000,8,2.5,ALARM: High Temp triggered";

        append_csv(&path, message, 30, now()).unwrap();
        append_csv(&path, message, 30, now()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_COLUMNS.join(","));
        assert!(lines[1].starts_with("2026-03-01T08:00:00+00:00,High Temp,"));
        assert!(lines[1].ends_with(",ALARM: High Temp triggered"));
    }

    #[test]
    fn csv_simple_format_quotes_message() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("simple.csv");

        append_csv(&path, "Wind, gusting \"hard\"", 30, now()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,message");
        assert_eq!(
            lines[1],
            "2026-03-01T08:00:00+00:00,\"Wind, gusting \"\"hard\"\"\""
        );
    }

    #[test]
    fn csv_rotates_old_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.csv");
        append_csv(&path, "first", 7, now()).unwrap();
        set_mtime(&path, SystemTime::from(now()) - Duration::from_secs(10 * 86_400));

        append_csv(&path, "second", 7, now()).unwrap();

        let backup = dir.path().join("old.csv.20260301080000.bak");
        assert!(backup.exists());
        let fresh = fs::read_to_string(&path).unwrap();
        assert!(fresh.contains("second"));
        assert!(!fresh.contains("first"));
    }

    #[test]
    fn recent_file_is_not_rotated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recent.csv");
        append_csv(&path, "first", 7, now()).unwrap();
        set_mtime(&path, SystemTime::from(now()) - Duration::from_secs(86_400));

        assert_eq!(rotate_if_expired(&path, 7, now()).unwrap(), None);
        assert_eq!(rotate_if_expired(&path, 0, now()).unwrap(), None);
    }

    #[test]
    fn json_appends_to_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alarms.json");

        append_json(&path, "Rain", "rain 10mm", 30, now()).unwrap();
        append_json(&path, "Wind", "gust 20", 30, now()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n"));
        let records: Vec<JsonRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].alarm, "Rain");
        assert_eq!(records[1].message, "gust 20");
    }

    #[test]
    fn json_rotates_old_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alarms.json");
        append_json(&path, "Rain", "old", 3, now()).unwrap();
        set_mtime(&path, SystemTime::from(now()) - Duration::from_secs(5 * 86_400));

        append_json(&path, "Rain", "new", 3, now()).unwrap();

        assert!(dir.path().join("alarms.json.20260301080000.bak").exists());
        let records: Vec<JsonRecord> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "new");
    }

    #[test]
    fn json_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        assert!(append_json(&path, "x", "y", 0, now()).is_err());
    }

    #[tokio::test]
    async fn notifiers_write_through_blocking_pool() {
        let dir = TempDir::new().unwrap();
        let csv = CsvFileNotifier::new(dir.path().join("a.csv"), 30);
        let json = JsonFileNotifier::new(dir.path().join("a.json"), 30);
        let notification = Notification {
            alarm_name: "Frost".into(),
            subject: None,
            message: "temp -1.5".into(),
            timestamp: now(),
        };

        csv.send(&notification).await.unwrap();
        json.send(&notification).await.unwrap();

        assert!(fs::read_to_string(dir.path().join("a.csv"))
            .unwrap()
            .contains("temp -1.5"));
        assert!(fs::read_to_string(dir.path().join("a.json"))
            .unwrap()
            .contains("\"alarm\": \"Frost\""));
    }
}
