use std::time::Duration;

use async_trait::async_trait;
use color_eyre::Result;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::config::Config;

/// Opaque confirmation that a send was attempted — not a receipt guarantee.
/// `provider_id` is `None` only in degraded mode, when a code was kept alive
/// despite an unconfirmed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReference {
    pub provider_id: Option<String>,
}

impl DeliveryReference {
    pub fn confirmed(id: impl Into<String>) -> Self {
        Self {
            provider_id: Some(id.into()),
        }
    }

    pub fn unconfirmed() -> Self {
        Self { provider_id: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmsError {
    #[error("destination is not a valid phone number")]
    InvalidNumber,
    #[error("destination number cannot receive SMS")]
    Unreachable,
    #[error("destination number is blocklisted by the carrier")]
    Blocklisted,
    #[error("transient delivery failure: {0}")]
    Transient(String),
}

impl SmsError {
    /// Permanent failures abort the request; transient ones are left to the
    /// caller to retry. The recovery service never retries on its own, so a
    /// flaky gateway cannot produce duplicate codes.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, SmsError::Transient(_))
    }
}

#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReference, SmsError>;
}

/// Body of the recovery SMS. Fixed template; the content is policy, not
/// negotiable per invocation.
pub fn recovery_message(platform_name: &str, code: &str) -> String {
    format!(
        "{platform_name}: your password reset code is {code}. \
         It is valid for 5 minutes. Do not share this code with anyone."
    )
}

/// Twilio-style REST gateway. Credentials and sender identity come from
/// deployment configuration; the request carries an explicit timeout so a
/// stalled gateway surfaces as a transient failure instead of hanging the
/// request.
pub struct HttpSmsGateway {
    client: reqwest::Client,
    api_url: String,
    account_id: String,
    auth_token: String,
    sender_id: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    sid: String,
}

#[derive(Debug, Deserialize, Default)]
struct GatewayErrorBody {
    code: Option<u32>,
    message: Option<String>,
}

impl HttpSmsGateway {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.sms_timeout_secs))
            .build()
            .map_err(|e| eyre::eyre!("Failed to build SMS client: {e}"))?;

        Ok(Self {
            client,
            api_url: config.sms_api_url.clone(),
            account_id: config.sms_account_id.clone(),
            auth_token: config.sms_auth_token.clone(),
            sender_id: config.sms_sender_id.clone(),
        })
    }

    fn classify(code: Option<u32>, message: String) -> SmsError {
        match code {
            Some(21211) => SmsError::InvalidNumber,
            Some(21614) => SmsError::Unreachable,
            Some(21610) => SmsError::Blocklisted,
            _ => SmsError::Transient(message),
        }
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    // body carries the code; keep it out of the trace fields
    #[instrument(skip(self, body))]
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReference, SmsError> {
        let params = [
            ("To", to),
            ("From", self.sender_id.as_str()),
            ("Body", body),
        ];
        let response = self
            .client
            .post(format!(
                "{}/Accounts/{}/Messages.json",
                self.api_url, self.account_id
            ))
            .basic_auth(&self.account_id, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| SmsError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let sent: SendResponse = response
                .json()
                .await
                .map_err(|e| SmsError::Transient(e.to_string()))?;
            return Ok(DeliveryReference::confirmed(sent.sid));
        }

        let error_body: GatewayErrorBody = response.json().await.unwrap_or_default();
        let message = error_body
            .message
            .unwrap_or_else(|| format!("gateway returned {status}"));
        Err(Self::classify(error_body.code, message))
    }
}
