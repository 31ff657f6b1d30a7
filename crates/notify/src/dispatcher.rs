//! Routes notifications to configured channels.
//!
//! The dispatcher renders a rule's templates per channel and delivers to
//! every channel configured for the triggering rule concurrently. Each send
//! is bounded by its own timeout, and individual channel failures don't
//! block other channels.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use stormwatch_core::Config;

use crate::channel::{ChannelConfig, ChannelKind};
use crate::templating::{AlarmContext, TemplateRenderer};
use crate::traits::{ChannelResult, Notification, Notifier, NotifyError};

/// Default upper bound for a single channel send.
pub const DEFAULT_CHANNEL_TIMEOUT: Duration = Duration::from_secs(10);

/// Used only when neither the channel nor the rule supplies a template.
const FALLBACK_TEMPLATE: &str = "{{message}}";

/// One channel of a rule, with its templates already selected.
#[derive(Clone)]
pub struct ChannelBinding {
    pub kind: ChannelKind,
    pub message_template: String,
    pub subject_template: Option<String>,
    pub notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for ChannelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBinding")
            .field("kind", &self.kind)
            .field("message_template", &self.message_template)
            .field("subject_template", &self.subject_template)
            .field("notifier", &self.notifier.channel_name())
            .finish()
    }
}

impl ChannelBinding {
    /// Bind a channel configuration, selecting its templates and building
    /// its notifier.
    pub fn from_config(
        channel: &ChannelConfig,
        rule_default: Option<&str>,
        settings: &Config,
    ) -> Result<Self, NotifyError> {
        Ok(Self::with_notifier(
            channel,
            rule_default,
            channel.build_notifier(settings)?,
        ))
    }

    /// Like [`from_config`](Self::from_config), but a channel that cannot be
    /// built is bound to a notifier that fails every send.
    pub fn from_config_lenient(
        channel: &ChannelConfig,
        rule_default: Option<&str>,
        settings: &Config,
    ) -> Self {
        Self::with_notifier(
            channel,
            rule_default,
            channel.build_notifier_or_unavailable(settings),
        )
    }

    pub fn with_notifier(
        channel: &ChannelConfig,
        rule_default: Option<&str>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            kind: channel.kind(),
            message_template: channel
                .message_template(rule_default)
                .unwrap_or(FALLBACK_TEMPLATE)
                .to_string(),
            subject_template: channel.subject_template().map(str::to_string),
            notifier,
        }
    }
}

/// Dispatches notifications to multiple channels, organized per-rule.
#[derive(Debug)]
pub struct Dispatcher {
    /// Rule name → channels for that rule.
    rule_channels: HashMap<String, Vec<ChannelBinding>>,
    renderer: TemplateRenderer,
    channel_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher with per-rule channel mapping.
    pub fn new(rule_channels: HashMap<String, Vec<ChannelBinding>>) -> Self {
        Self {
            rule_channels,
            renderer: TemplateRenderer::new(),
            channel_timeout: DEFAULT_CHANNEL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.channel_timeout = timeout;
        self
    }

    fn channels(&self, rule: &str) -> &[ChannelBinding] {
        self.rule_channels
            .get(rule)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn render(&self, binding: &ChannelBinding, ctx: &AlarmContext) -> Notification {
        Notification {
            alarm_name: ctx.alarm.name.clone(),
            subject: binding
                .subject_template
                .as_deref()
                .map(|t| self.renderer.render(t, ctx)),
            message: self.renderer.render(&binding.message_template, ctx),
            timestamp: ctx.observation.timestamp,
        }
    }

    async fn deliver(&self, rule: &str, binding: &ChannelBinding, ctx: &AlarmContext) -> ChannelResult {
        let notification = self.render(binding, ctx);
        let start = Instant::now();
        let result = match tokio::time::timeout(
            self.channel_timeout,
            binding.notifier.send(&notification),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.channel_timeout.as_secs())),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, error) = match result {
            Ok(()) => {
                tracing::info!(
                    rule,
                    channel = %binding.kind,
                    duration_ms,
                    "Notification delivered"
                );
                (true, None)
            }
            Err(e) => {
                tracing::warn!(
                    rule,
                    channel = %binding.kind,
                    error = %e,
                    duration_ms,
                    "Notification delivery failed"
                );
                (false, Some(e.to_string()))
            }
        };

        ChannelResult {
            channel: binding.kind.as_str().to_string(),
            success,
            error,
            duration_ms,
        }
    }

    /// Dispatch a fired rule to all its channels.
    ///
    /// Channels are attempted concurrently; results are returned in channel
    /// order. Individual failures don't block other channels.
    pub async fn dispatch(&self, rule: &str, ctx: &AlarmContext) -> Vec<ChannelResult> {
        let channels = self.channels(rule);
        if channels.is_empty() {
            tracing::debug!(rule, "No notification channels configured");
            return Vec::new();
        }

        futures::future::join_all(
            channels
                .iter()
                .map(|binding| self.deliver(rule, binding, ctx)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templating::tests::sample_context;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockNotifier {
        name: String,
        send_count: Arc<AtomicUsize>,
        should_fail: bool,
        delay: Option<Duration>,
        received: Arc<Mutex<Vec<Notification>>>,
    }

    impl MockNotifier {
        fn new(name: &str, should_fail: bool) -> Self {
            Self {
                name: name.to_string(),
                send_count: Arc::new(AtomicUsize::new(0)),
                should_fail,
                delay: None,
                received: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.send_count.fetch_add(1, Ordering::SeqCst);
            self.received.lock().push(notification.clone());
            if self.should_fail {
                Err(NotifyError::Config("mock failure".to_string()))
            } else {
                Ok(())
            }
        }
        fn channel_name(&self) -> &str {
            &self.name
        }
    }

    fn console(template: Option<&str>) -> ChannelConfig {
        ChannelConfig::Console {
            template: template.map(str::to_string),
        }
    }

    fn binding(channel: &ChannelConfig, notifier: MockNotifier) -> ChannelBinding {
        ChannelBinding::with_notifier(channel, None, Arc::new(notifier))
    }

    fn for_rule(rule: &str, bindings: Vec<ChannelBinding>) -> Dispatcher {
        Dispatcher::new(HashMap::from([(rule.to_string(), bindings)]))
    }

    #[tokio::test]
    async fn dispatch_to_all_channels() {
        let a = MockNotifier::new("a", false);
        let b = MockNotifier::new("b", false);
        let (count_a, count_b) = (a.send_count.clone(), b.send_count.clone());

        let dispatcher = for_rule(
            "rule-1",
            vec![
                binding(&console(Some("{{alarm_name}}")), a),
                binding(&console(Some("{{alarm_name}}")), b),
            ],
        );

        let results = dispatcher.dispatch("rule-1", &sample_context()).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn partial_failure_doesnt_block() {
        let failing = MockNotifier::new("fail", true);
        let ok = MockNotifier::new("ok", false);
        let count = ok.send_count.clone();

        let dispatcher = for_rule(
            "rule-1",
            vec![binding(&console(Some("x")), failing), binding(&console(Some("y")), ok)],
        );

        let results = dispatcher.dispatch("rule-1", &sample_context()).await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert_eq!(results[0].error.as_deref(), Some("Configuration error: mock failure"));
        assert!(results[1].success);
        assert_eq!(count.load(Ordering::SeqCst), 1); // second channel still sent
    }

    #[tokio::test]
    async fn slow_channel_times_out_without_blocking_siblings() {
        let mut slow = MockNotifier::new("slow", false);
        slow.delay = Some(Duration::from_secs(5));
        let fast = MockNotifier::new("fast", false);

        let dispatcher = for_rule(
            "rule-1",
            vec![binding(&console(Some("x")), slow), binding(&console(Some("y")), fast)],
        )
        .with_timeout(Duration::from_millis(50));

        let start = Instant::now();
        let results = dispatcher.dispatch("rule-1", &sample_context()).await;
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("Timed out"));
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn renders_channel_template_before_rule_default() {
        let with_own = MockNotifier::new("own", false);
        let with_default = MockNotifier::new("default", false);
        let (own_rx, default_rx) = (with_own.received.clone(), with_default.received.clone());

        let rule_default = Some("Rule {{alarm_name}}");
        let dispatcher = for_rule(
            "High Temp",
            vec![
                ChannelBinding::with_notifier(
                    &console(Some("Own {{ alarm_name | upper }}")),
                    rule_default,
                    Arc::new(with_own),
                ),
                ChannelBinding::with_notifier(&console(None), rule_default, Arc::new(with_default)),
            ],
        );

        dispatcher.dispatch("High Temp", &sample_context()).await;
        assert_eq!(own_rx.lock()[0].message, "Own HIGH TEMP");
        assert_eq!(default_rx.lock()[0].message, "Rule High Temp");
    }

    #[tokio::test]
    async fn email_subject_is_rendered() {
        let mock = MockNotifier::new("email", false);
        let received = mock.received.clone();
        let email: ChannelConfig = serde_json::from_value(serde_json::json!({
            "type": "email",
            "email": {"to": ["a@example.com"], "subject": "[{{station}}] {{alarm_name}}", "body": "{{temperature}}"}
        }))
        .unwrap();

        let dispatcher = for_rule("High Temp", vec![binding(&email, mock)]);
        let ctx = sample_context();
        dispatcher.dispatch("High Temp", &ctx).await;

        let sent = &received.lock()[0];
        assert_eq!(sent.subject.as_deref(), Some(format!("[{}] High Temp", ctx.station).as_str()));
        assert_eq!(sent.timestamp, ctx.observation.timestamp);
    }

    #[tokio::test]
    async fn unavailable_channel_reports_failure() {
        let sms: ChannelConfig = serde_json::from_value(serde_json::json!({
            "type": "sms", "sms": {"to": ["+15550100"], "message": "hi"}
        }))
        .unwrap();
        let ok = MockNotifier::new("ok", false);

        let dispatcher = for_rule(
            "rule-1",
            vec![
                ChannelBinding::from_config_lenient(&sms, None, &Config::default()),
                binding(&console(Some("x")), ok),
            ],
        );
        assert!(ChannelBinding::from_config(&sms, None, &Config::default()).is_err());

        let results = dispatcher.dispatch("rule-1", &sample_context()).await;
        assert_eq!(results[0].channel, "sms");
        assert!(!results[0].success);
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn unknown_rule_returns_empty() {
        let dispatcher = Dispatcher::new(HashMap::new());
        let results = dispatcher.dispatch("nonexistent", &sample_context()).await;
        assert!(results.is_empty());
    }
}
