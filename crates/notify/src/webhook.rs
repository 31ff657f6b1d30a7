//! Generic HTTP webhook notifier.
//!
//! Sends the rendered body template to a configured URL with optional
//! custom headers.

use std::collections::HashMap;

use crate::traits::{Notification, Notifier, NotifyError};

/// Delivers rendered notifications over HTTP to a configured endpoint.
///
/// Environment variable references (`${VAR_NAME}`) in the URL and header
/// values are resolved at construction time.
#[derive(Debug)]
pub struct WebhookNotifier {
    /// Target URL (env vars already resolved).
    url: String,
    /// HTTP method (defaults to POST).
    method: reqwest::Method,
    /// Custom headers to include on every request.
    headers: HashMap<String, String>,
    content_type: String,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Construct a [`WebhookNotifier`] from config-level primitives.
    ///
    /// `method` is parsed case-insensitively and defaults to `POST`;
    /// `content_type` defaults to `application/json`. Missing env vars and
    /// invalid methods produce [`NotifyError::Config`].
    pub fn from_config(
        url: String,
        method: Option<String>,
        headers: Option<HashMap<String, String>>,
        content_type: Option<String>,
    ) -> Result<Self, NotifyError> {
        let method = match method.filter(|m| !m.trim().is_empty()) {
            Some(m) => m
                .trim()
                .to_uppercase()
                .parse::<reqwest::Method>()
                .map_err(|_| NotifyError::Config(format!("invalid HTTP method: {m}")))?,
            None => reqwest::Method::POST,
        };

        let url = resolve_env_vars(&url)?;
        if url.trim().is_empty() {
            return Err(NotifyError::Config("webhook url is required".to_string()));
        }

        let headers = headers.unwrap_or_default();
        let mut resolved_headers = HashMap::with_capacity(headers.len());
        for (key, value) in &headers {
            resolved_headers.insert(key.clone(), resolve_env_vars(value)?);
        }

        Ok(Self {
            url,
            method,
            headers: resolved_headers,
            content_type: content_type
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "application/json".to_string()),
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .header(reqwest::header::CONTENT_TYPE, self.content_type.as_str())
            .body(notification.message.clone());

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %self.url,
                %status,
                body = %body_text,
                "webhook returned non-2xx status"
            );
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: body_text,
            });
        }

        tracing::debug!(
            url = %self.url,
            method = %self.method,
            status = %status,
            "webhook notification delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(NotifyError::Config(format!(
                    "unclosed env var reference in: {input}"
                )));
            }
            let value = std::env::var(&var_name).map_err(|_| {
                NotifyError::Config(format!("env var not found: {var_name}"))
            })?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notification(body: &str) -> Notification {
        Notification {
            alarm_name: "Rain".into(),
            subject: None,
            message: body.into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("WEBHOOK_TEST_HOST", "example.com");
        let result = resolve_env_vars("https://${WEBHOOK_TEST_HOST}/hook").unwrap();
        assert_eq!(result, "https://example.com/hook");
        std::env::remove_var("WEBHOOK_TEST_HOST");
    }

    #[test]
    fn resolve_env_vars_missing() {
        let result = resolve_env_vars("https://${ABSOLUTELY_NOT_SET_12345}/hook");
        match result.unwrap_err() {
            NotifyError::Config(msg) => assert!(msg.contains("ABSOLUTELY_NOT_SET_12345")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn resolve_env_vars_unclosed() {
        match resolve_env_vars("https://${UNCLOSED/hook").unwrap_err() {
            NotifyError::Config(msg) => assert!(msg.contains("unclosed")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn defaults_to_post_and_json() {
        let notifier =
            WebhookNotifier::from_config("https://example.com".into(), None, None, None).unwrap();
        assert_eq!(notifier.method, reqwest::Method::POST);
        assert_eq!(notifier.content_type, "application/json");
    }

    #[test]
    fn method_is_case_insensitive() {
        let notifier = WebhookNotifier::from_config(
            "https://example.com".into(),
            Some("put".into()),
            None,
            None,
        )
        .unwrap();
        assert_eq!(notifier.method, reqwest::Method::PUT);
    }

    #[test]
    fn invalid_method_rejected() {
        let result = WebhookNotifier::from_config(
            "https://example.com".into(),
            Some("NOT A METHOD".into()),
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_url_rejected() {
        assert!(WebhookNotifier::from_config(" ".into(), None, None, None).is_err());
    }

    #[test]
    fn headers_resolve_env_vars() {
        std::env::set_var("WT_API_KEY", "secret-key-123");
        let headers = HashMap::from([
            ("X-Api-Key".to_string(), "${WT_API_KEY}".to_string()),
            ("X-Static".to_string(), "fixed-value".to_string()),
        ]);
        let notifier =
            WebhookNotifier::from_config("https://example.com".into(), None, Some(headers), None)
                .unwrap();
        assert_eq!(notifier.headers["X-Api-Key"], "secret-key-123");
        assert_eq!(notifier.headers["X-Static"], "fixed-value");
        std::env::remove_var("WT_API_KEY");
    }

    #[tokio::test]
    async fn sends_rendered_body_with_content_type() {
        let (base, server) = crate::test_support::http_stub("200 OK").await;
        let notifier = WebhookNotifier::from_config(
            format!("{base}/hook"),
            None,
            Some(HashMap::from([("X-Token".to_string(), "abc".to_string())])),
            Some("text/plain".into()),
        )
        .unwrap();

        notifier.send(&notification("rain 12.5 mm/h")).await.unwrap();

        let request = server.await.unwrap();
        let lower = request.to_lowercase();
        assert!(request.starts_with("POST /hook"));
        assert!(lower.contains("content-type: text/plain"));
        assert!(lower.contains("x-token: abc"));
        assert!(request.ends_with("rain 12.5 mm/h"));
    }

    #[tokio::test]
    async fn non_2xx_is_rejected() {
        let (base, server) = crate::test_support::http_stub("500 Internal Server Error").await;
        let notifier = WebhookNotifier::from_config(base, None, None, None).unwrap();

        let err = notifier.send(&notification("{}")).await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 500, .. }));
        server.await.unwrap();
    }
}
