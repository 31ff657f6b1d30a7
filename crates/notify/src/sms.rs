//! SMS delivery through the Twilio REST API.

use stormwatch_core::config::TwilioConfig;
use stormwatch_core::Config;

use crate::channel::SmsSettings;
use crate::traits::{Notification, Notifier, NotifyError};

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug)]
enum Provider {
    Twilio {
        account_sid: String,
        auth_token: String,
        from_number: String,
        base_url: String,
        client: reqwest::Client,
    },
    /// Credentials present but delivery is not implemented.
    AwsSns,
}

#[derive(Debug)]
pub struct SmsNotifier {
    provider: Provider,
    to: Vec<String>,
}

impl SmsNotifier {
    /// Twilio is used when its credentials are set; AWS SNS credentials are
    /// recognised but rejected at send time.
    pub fn from_settings(sms: &SmsSettings, settings: &Config) -> Result<Self, NotifyError> {
        if sms.to.is_empty() {
            return Err(NotifyError::Config(
                "at least one phone number is required".to_string(),
            ));
        }
        let provider = if settings.twilio.is_configured() {
            Self::twilio(&settings.twilio, TWILIO_API)?
        } else if settings.aws_sns.is_configured() {
            Provider::AwsSns
        } else {
            return Err(NotifyError::Config(
                "no SMS provider configured (set TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_FROM_NUMBER)"
                    .to_string(),
            ));
        };
        Ok(Self {
            provider,
            to: sms.to.clone(),
        })
    }

    fn twilio(config: &TwilioConfig, base_url: &str) -> Result<Provider, NotifyError> {
        match (&config.account_sid, &config.auth_token, &config.from_number) {
            (Some(sid), Some(token), Some(from)) => Ok(Provider::Twilio {
                account_sid: sid.clone(),
                auth_token: token.clone(),
                from_number: from.clone(),
                base_url: base_url.trim_end_matches('/').to_string(),
                client: reqwest::Client::new(),
            }),
            _ => Err(NotifyError::Config("incomplete Twilio settings".to_string())),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SmsNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let Provider::Twilio {
            account_sid,
            auth_token,
            from_number,
            base_url,
            client,
        } = &self.provider
        else {
            return Err(NotifyError::Unsupported(
                "AWS SNS delivery is not available; configure Twilio".to_string(),
            ));
        };

        let url = format!("{base_url}/Accounts/{account_sid}/Messages.json");
        for number in &self.to {
            let params = [
                ("To", number.as_str()),
                ("From", from_number.as_str()),
                ("Body", notification.message.as_str()),
            ];
            let response = client
                .post(&url)
                .basic_auth(account_sid, Some(auth_token))
                .form(&params)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<unreadable body>".to_string());
                tracing::warn!(to = %number, %status, "SMS provider rejected message");
                return Err(NotifyError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }
        }

        tracing::debug!(recipients = self.to.len(), "SMS delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "sms"
    }
}
