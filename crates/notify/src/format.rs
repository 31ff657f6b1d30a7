//! Text and HTML renderings of alarm metadata and sensor readings.
//!
//! These back the `{{alarm_info}}`, `{{sensor_info}}` and `{{app_info}}`
//! template placeholders.

use std::time::Duration;

use stormwatch_core::field::{cardinal_direction, celsius_to_fahrenheit, mm_to_inches, mps_to_mph};
use stormwatch_core::Field;

use crate::templating::{AlarmContext, AlarmSummary};

const CELL: &str = r#"style="padding: 5px; border: 1px solid #ddd;""#;
const LABEL_CELL: &str = r#"style="padding: 5px; border: 1px solid #ddd; font-weight: bold;""#;

/// Decimal places used when a field is rendered into a message.
pub fn decimals(field: Field) -> usize {
    match field {
        Field::Pressure | Field::RainRate | Field::RainDaily => 2,
        Field::Temperature | Field::WindSpeed | Field::WindGust | Field::LightningDistance => 1,
        _ => 0,
    }
}

pub fn format_value(field: Field, value: f64) -> String {
    format!("{:.*}", decimals(field), value)
}

/// Round to a whole number and insert thousands separators.
pub fn format_number(n: f64) -> String {
    let digits = format!("{:.0}", n.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0.0 && digits != "0" {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// True when the template looks like HTML markup.
pub fn is_html(template: &str) -> bool {
    ["<html>", "<table>", "<div", "<h1>", "<h2>", "<p>"]
        .iter()
        .any(|marker| template.contains(marker))
}

fn format_uptime(uptime: Duration) -> String {
    let total_minutes = uptime.as_secs() / 60;
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;
    if days > 0 {
        format!("{days} days, {hours} hours, {minutes} minutes")
    } else if hours > 0 {
        format!("{hours} hours, {minutes} minutes")
    } else {
        format!("{minutes} minutes")
    }
}

pub fn app_info(uptime: Duration, html: bool) -> String {
    let version = env!("CARGO_PKG_VERSION");
    let uptime = format_uptime(uptime);
    if html {
        format!(
            r#"<div style="font-size: 11px; color: #666; font-family: monospace;"><strong>Stormwatch</strong> {version} | Uptime: {uptime}</div>"#
        )
    } else {
        format!("Stormwatch {version} | Uptime: {uptime}")
    }
}

fn format_cooldown(secs: u64) -> String {
    if secs >= 3600 {
        format!("{} hours", secs / 3600)
    } else if secs >= 60 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{secs} seconds")
    }
}

pub fn alarm_info(alarm: &AlarmSummary, html: bool) -> String {
    let status = if alarm.enabled { "enabled" } else { "disabled" };
    let cooldown = format_cooldown(alarm.cooldown_secs);
    let tags = if alarm.tags.is_empty() {
        "none".to_string()
    } else {
        alarm.tags.join(", ")
    };
    let rows = [
        ("Alarm", alarm.name.as_str()),
        ("Description", alarm.description.as_str()),
        ("Condition", alarm.condition.as_str()),
        ("Status", status),
        ("Cooldown", cooldown.as_str()),
        ("Tags", tags.as_str()),
    ];

    if html {
        let mut out = String::from(r#"<table style="border-collapse: collapse; width: 100%;">"#);
        for (label, value) in rows {
            out.push_str(&format!(
                r#"<tr><td {LABEL_CELL}>{label}:</td><td {CELL}>{value}</td></tr>"#
            ));
        }
        out.push_str("</table>");
        out
    } else {
        rows.iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One sensor row: label, current rendering, last rendering, change threshold.
struct SensorRow {
    label: &'static str,
    field: Field,
    current: String,
    last: String,
    threshold: f64,
}

fn sensor_rows(ctx: &AlarmContext) -> Vec<SensorRow> {
    let obs = &ctx.observation;
    let last = |field: Field| match ctx.last_value(field) {
        Some(v) if field == Field::Lux => format_number(v),
        Some(v) => format_value(field, v),
        None => "N/A".to_string(),
    };
    let row = |label: &'static str, field: Field, current: String, unit: &str, threshold: f64| SensorRow {
        label,
        field,
        current,
        last: {
            let value = last(field);
            if value == "N/A" || unit.is_empty() {
                value
            } else {
                format!("{value}{unit}")
            }
        },
        threshold,
    };

    vec![
        row(
            "Temperature",
            Field::Temperature,
            format!(
                "{:.1}°F ({:.1}°C)",
                celsius_to_fahrenheit(obs.temperature),
                obs.temperature
            ),
            "°C",
            0.1,
        ),
        row("Humidity", Field::Humidity, format!("{:.0}%", obs.humidity), "%", 1.0),
        row("Pressure", Field::Pressure, format!("{:.2} mb", obs.pressure), " mb", 0.1),
        row(
            "Wind Speed",
            Field::WindSpeed,
            format!("{:.1} mph ({:.1} m/s)", mps_to_mph(obs.wind_speed), obs.wind_speed),
            " m/s",
            0.1,
        ),
        row(
            "Wind Gust",
            Field::WindGust,
            format!("{:.1} mph ({:.1} m/s)", mps_to_mph(obs.wind_gust), obs.wind_gust),
            " m/s",
            0.1,
        ),
        row(
            "Wind Direction",
            Field::WindDirection,
            format!(
                "{:.0}° ({})",
                obs.wind_direction,
                cardinal_direction(obs.wind_direction)
            ),
            "°",
            5.0,
        ),
        row("UV Index", Field::Uv, format!("{:.0}", obs.uv), "", 0.5),
        row(
            "Illuminance",
            Field::Lux,
            format!("{} lux", format_number(obs.lux)),
            " lux",
            100.0,
        ),
        row(
            "Rain Rate",
            Field::RainRate,
            format!("{:.2} mm/hr", obs.rain_rate),
            " mm/hr",
            0.01,
        ),
        row(
            "Daily Rain",
            Field::RainDaily,
            format!("{:.2} in ({:.1} mm)", mm_to_inches(obs.rain_daily), obs.rain_daily),
            " mm",
            0.1,
        ),
        row(
            "Lightning",
            Field::LightningCount,
            format!("{:.0} strikes", obs.lightning_count),
            " strikes",
            0.5,
        ),
    ]
}

/// Current readings alongside the value the rule last compared against.
pub fn sensor_info(ctx: &AlarmContext, html: bool) -> String {
    let rows = sensor_rows(ctx);
    if !html {
        return rows
            .iter()
            .map(|r| format!("{}: {} [Last: {}]", r.label, r.current, r.last))
            .collect::<Vec<_>>()
            .join("\n");
    }

    let mut out = String::from(r#"<table style="border-collapse: collapse; width: 100%;">"#);
    out.push_str(&format!(
        r#"<tr style="background: #f0f0f0;"><th {CELL}>Sensor</th><th {CELL}>Current</th><th {CELL}>Last</th></tr>"#
    ));
    for r in &rows {
        let changed = ctx
            .last_value(r.field)
            .map(|prev| (ctx.observation.get(r.field) - prev).abs() > r.threshold)
            .unwrap_or(false);
        let style = if changed {
            r#" style="background: #fff3cd;""#
        } else {
            ""
        };
        out.push_str(&format!(
            r#"<tr{style}><td {CELL}><strong>{}:</strong></td><td {CELL}>{}</td><td {CELL}>{}</td></tr>"#,
            r.label, r.current, r.last
        ));
    }
    out.push_str("</table>");
    out
}
