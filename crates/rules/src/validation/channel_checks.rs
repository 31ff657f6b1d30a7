//! Notification channel checks: required parameters and templates.

use stormwatch_notify::channel::{ChannelConfig, FileSettings};
use stormwatch_notify::templating::{is_known_placeholder, placeholders};
use stormwatch_notify::TemplateRenderer;

use super::ValidationResult;
use crate::schema::RuleDefinition;

const WEBHOOK_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];

pub(super) fn validate_channels(rule: &RuleDefinition, path: &str, result: &mut ValidationResult) {
    if rule.channels.is_empty() {
        result.error(
            format!("{path}.channels"),
            "At least one notification channel must be configured",
        );
        return;
    }

    let renderer = TemplateRenderer::new();
    for (i, channel) in rule.channels.iter().enumerate() {
        let path = format!("{path}.channels[{i}]");
        validate_parameters(channel, &path, result);

        match channel.message_template(rule.template.as_deref()) {
            Some(template) => check_template(&renderer, template, &path, result),
            None => result.error(
                format!("{path}.template"),
                format!(
                    "{} channel has no message template and the alarm defines none",
                    channel.kind()
                ),
            ),
        }
        if let Some(subject) = channel.subject_template() {
            check_template(&renderer, subject, &format!("{path}.email.subject"), result);
        }
    }
}

fn validate_parameters(channel: &ChannelConfig, path: &str, result: &mut ValidationResult) {
    match channel {
        ChannelConfig::Email { email, .. } => {
            if email.to.iter().all(|t| t.trim().is_empty()) {
                result.error(format!("{path}.email.to"), "Email channel requires at least one recipient");
            }
            if channel.subject_template().is_none() {
                result.warn(format!("{path}.email.subject"), "Email channel has no subject");
            }
        }
        ChannelConfig::Sms { sms, .. } => {
            if sms.to.iter().all(|t| t.trim().is_empty()) {
                result.error(format!("{path}.sms.to"), "SMS channel requires at least one recipient");
            }
        }
        ChannelConfig::Webhook { webhook, .. } => {
            let url = webhook.url.trim();
            if url.is_empty() {
                result.error(format!("{path}.webhook.url"), "Webhook channel requires 'url'");
            } else if !url.starts_with("http://")
                && !url.starts_with("https://")
                && !url.starts_with("${")
            {
                result.error(
                    format!("{path}.webhook.url"),
                    format!("URL must start with http:// or https://, got '{url}'"),
                );
            }
            if let Some(method) = webhook.method.as_deref().filter(|m| !m.trim().is_empty()) {
                if !WEBHOOK_METHODS.contains(&method.trim().to_uppercase().as_str()) {
                    result.error(
                        format!("{path}.webhook.method"),
                        format!(
                            "Unsupported HTTP method '{method}', expected one of {}",
                            WEBHOOK_METHODS.join(", ")
                        ),
                    );
                }
            }
        }
        ChannelConfig::Csv { csv: file, .. } => check_file(file, &format!("{path}.csv"), result),
        ChannelConfig::Json { json: file, .. } => check_file(file, &format!("{path}.json"), result),
        ChannelConfig::Console { .. }
        | ChannelConfig::Syslog { .. }
        | ChannelConfig::Oslog { .. }
        | ChannelConfig::Eventlog { .. } => {}
    }
}

fn check_file(file: &FileSettings, path: &str, result: &mut ValidationResult) {
    if file.path.as_os_str().is_empty() {
        result.error(format!("{path}.path"), "File channel requires 'path'");
    }
}

fn check_template(
    renderer: &TemplateRenderer,
    template: &str,
    path: &str,
    result: &mut ValidationResult,
) {
    if let Err(e) = renderer.validate(template) {
        result.warn(path, format!("Template does not parse and will render literally: {e}"));
    }
    for name in placeholders(template) {
        if !name.is_empty() && !is_known_placeholder(&name) {
            result.warn(path, format!("Unknown placeholder '{{{{{name}}}}}' renders unchanged"));
        }
    }
}
