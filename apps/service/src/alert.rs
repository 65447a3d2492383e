//! Outbound user notifications.

use anyhow::{Result, bail};
use async_trait::async_trait;
use tracing::info;

use crate::config::SmsConfig;
use crate::monitoring::validation::is_valid_phone;

/// Maximum SMS body length accepted by the gateway.
const MAX_MESSAGE_LEN: usize = 1600;

/// External notification channel, keyed by the check owner's identifier.
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    async fn send(&self, recipient: &str, message: &str) -> Result<()>;
}

/// Twilio-style SMS gateway.
pub struct SmsGateway {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl SmsGateway {
    pub fn new(config: &SmsConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        })
    }
}

#[async_trait]
impl AlertDispatcher for SmsGateway {
    async fn send(&self, recipient: &str, message: &str) -> Result<()> {
        // Same owner-identifier predicate the validator applies.
        if !is_valid_phone(recipient) {
            bail!("invalid recipient: {recipient}");
        }
        let message = message.trim();
        if message.is_empty() || message.len() > MAX_MESSAGE_LEN {
            bail!("message is empty or exceeds {MAX_MESSAGE_LEN} characters");
        }

        let endpoint = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        let to = format!("+1{recipient}");
        let params =
            [("From", self.from_number.as_str()), ("To", to.as_str()), ("Body", message)];

        let response = self
            .client
            .post(&endpoint)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!("sms gateway returned status {status}");
        }
        Ok(())
    }
}

/// Fallback dispatcher for deployments without gateway credentials: the
/// alert is only written to the process log.
pub struct LogDispatcher;

#[async_trait]
impl AlertDispatcher for LogDispatcher {
    async fn send(&self, recipient: &str, message: &str) -> Result<()> {
        info!(recipient, "alert (no sms gateway configured): {message}");
        Ok(())
    }
}
