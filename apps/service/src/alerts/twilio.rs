use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AlertDispatcher, AlertError};

const PHONE_LEN: usize = 10;
const MAX_MESSAGE_LEN: usize = 1600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone: String,
    /// Prepended to the 10-digit recipient number
    #[serde(default = "default_country_prefix")]
    pub country_prefix: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_country_prefix() -> String {
    "+91".to_string()
}

fn default_api_base() -> String {
    "https://api.twilio.com".to_string()
}

impl TwilioConfig {
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_phone.is_empty()
    }
}

/// SMS alerts through the Twilio messages API
pub struct TwilioSms {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioSms {
    pub fn new(config: TwilioConfig) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl AlertDispatcher for TwilioSms {
    async fn notify(&self, recipient: &str, message: &str) -> Result<(), AlertError> {
        let phone = recipient.trim();
        if phone.chars().count() != PHONE_LEN {
            return Err(AlertError::Invalid("recipient must be a 10 digit phone number"));
        }
        let body_len = message.trim().chars().count();
        if body_len == 0 || body_len > MAX_MESSAGE_LEN {
            return Err(AlertError::Invalid("message must be between 1 and 1600 characters"));
        }

        let to = format!("{}{}", self.config.country_prefix, phone);
        let form = [("From", self.config.from_phone.as_str()), ("To", to.as_str()), ("Body", message)];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await?;

        match response.status().as_u16() {
            200 | 201 => {
                debug!(to = %to, "SMS alert accepted");
                Ok(())
            }
            status => Err(AlertError::Rejected(status)),
        }
    }
}
