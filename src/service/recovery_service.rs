use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::crypto::CryptoService;
use crate::models::otp_code::OtpCode;
use crate::service::sms_service::{recovery_message, DeliveryReference, SmsError, SmsGateway};
use crate::store::{CredentialStore, IssuanceOutcome, OtpLedger};
use crate::utils::clock::Clock;
use crate::utils::phone::DialingPlan;

const MIN_PASSWORD_LEN: usize = 6;

/// Everything the recovery flow can report to a caller. All variants except
/// `Infrastructure` are recoverable: the caller retries with different input
/// or waits. Callers pattern-match on the kind, never on message text.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// No account for this phone number. Upstream presents malformed and
    /// unregistered numbers identically; only the kind is distinguished here.
    #[error("no account registered for this phone number")]
    AccountNotFound,

    #[error("a code was already issued for this number within the last minute")]
    RateLimited,

    #[error("could not deliver the code")]
    DeliveryFailed(#[source] SmsError),

    #[error("code must be exactly 6 digits")]
    InvalidFormat,

    /// Never issued, already consumed, or the presented value is wrong.
    #[error("no pending code for this phone number")]
    CodeNotFound,

    #[error("the code has expired")]
    CodeExpired,

    #[error("new password must differ from the current one")]
    SamePassword,

    #[error("password must be at least 6 characters")]
    WeakPassword,

    /// Persistence or internal faults. Never conflated with delivery
    /// failures.
    #[error("internal error: {0}")]
    Infrastructure(eyre::Report),
}

impl From<eyre::Report> for RecoveryError {
    fn from(report: eyre::Report) -> Self {
        RecoveryError::Infrastructure(report)
    }
}

/// Deployment policy for the recovery flow.
pub struct RecoveryPolicy {
    pub platform_name: String,
    pub dialing_plan: DialingPlan,
    /// Degraded mode: a delivery failure leaves the issued code usable and
    /// returns an unconfirmed reference. Production keeps this `false`, so a
    /// failed delivery never consumes the caller's rate window.
    pub allow_unconfirmed_delivery: bool,
}

/// Acknowledgment returned by a successful verification. The code itself
/// stays in the ledger: it is the capability the user carries into the reset
/// step.
#[derive(Debug, Serialize)]
pub struct VerifyAck {
    pub expires_at: DateTime<Utc>,
}

/// Drives the three-step recovery protocol: issue, verify, consume-and-reset.
/// All coordination happens through the injected ledger; the service itself
/// holds no mutable state.
pub struct RecoveryService {
    accounts: Arc<dyn CredentialStore>,
    ledger: Arc<dyn OtpLedger>,
    gateway: Arc<dyn SmsGateway>,
    clock: Arc<dyn Clock>,
    crypto: CryptoService,
    policy: RecoveryPolicy,
}

impl RecoveryService {
    pub fn new(
        accounts: Arc<dyn CredentialStore>,
        ledger: Arc<dyn OtpLedger>,
        gateway: Arc<dyn SmsGateway>,
        clock: Arc<dyn Clock>,
        crypto: CryptoService,
        policy: RecoveryPolicy,
    ) -> Self {
        Self {
            accounts,
            ledger,
            gateway,
            clock,
            crypto,
            policy,
        }
    }

    #[instrument(skip(self))]
    pub async fn request_code(
        &self,
        phone_number: &str,
    ) -> Result<DeliveryReference, RecoveryError> {
        let Some(phone) = self.policy.dialing_plan.normalize(phone_number) else {
            // No account can exist for a number that does not normalize.
            return Err(RecoveryError::AccountNotFound);
        };
        if self.accounts.find_by_phone(&phone).await?.is_none() {
            return Err(RecoveryError::AccountNotFound);
        }

        let code = self.crypto.generate_otp_code();
        let code_hash = self.crypto.hash_password(&code)?;
        let now = self.clock.now();

        // Atomic replace-unless-recent: any prior code is invalidated here,
        // and of two concurrent requests exactly one wins the window.
        match self.ledger.issue(&phone, &code_hash, now).await? {
            IssuanceOutcome::RateLimited => return Err(RecoveryError::RateLimited),
            IssuanceOutcome::Issued => {}
        }

        let body = recovery_message(&self.policy.platform_name, &code);
        match self.gateway.send(&phone, &body).await {
            Ok(reference) => {
                info!(phone = %phone, "recovery code issued and delivered");
                Ok(reference)
            }
            Err(error) if self.policy.allow_unconfirmed_delivery => {
                warn!(phone = %phone, %error, "delivery unconfirmed, keeping code");
                Ok(DeliveryReference::unconfirmed())
            }
            Err(error) => {
                // Roll back so the failed attempt does not consume the
                // caller's rate window.
                self.ledger.remove(&phone).await?;
                Err(RecoveryError::DeliveryFailed(error))
            }
        }
    }

    #[instrument(skip(self, code))]
    pub async fn verify_code(
        &self,
        phone_number: &str,
        code: &str,
    ) -> Result<VerifyAck, RecoveryError> {
        check_code_format(code)?;
        let Some(phone) = self.policy.dialing_plan.normalize(phone_number) else {
            return Err(RecoveryError::CodeNotFound);
        };

        let record = self.pending_code(&phone, code).await?;
        Ok(VerifyAck {
            expires_at: record.expires_at(),
        })
    }

    #[instrument(skip(self, code, new_password))]
    pub async fn reset_password(
        &self,
        phone_number: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), RecoveryError> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(RecoveryError::WeakPassword);
        }
        check_code_format(code)?;
        let Some(phone) = self.policy.dialing_plan.normalize(phone_number) else {
            return Err(RecoveryError::AccountNotFound);
        };
        let account = self
            .accounts
            .find_by_phone(&phone)
            .await?
            .ok_or(RecoveryError::AccountNotFound)?;

        // Same checks as verify_code: a code that expired between the two
        // calls must not authorize a reset.
        self.pending_code(&phone, code).await?;

        if self.crypto.verify_password(new_password, &account.password_hash)? {
            return Err(RecoveryError::SamePassword);
        }

        let password_hash = self.crypto.hash_password(new_password)?;
        // Password first, code row second: if the password write fails the
        // code stays valid and the whole call is retryable.
        self.accounts
            .update_password(account.id, &password_hash)
            .await?;
        self.ledger.remove(&phone).await?;

        info!(phone = %phone, "password reset completed");
        Ok(())
    }

    /// Looks up the pending code for `phone` and checks expiry and value.
    /// Expired rows are deleted on sight, so a later call sees `CodeNotFound`
    /// instead of a ghost row.
    async fn pending_code(&self, phone: &str, code: &str) -> Result<OtpCode, RecoveryError> {
        let record = self
            .ledger
            .find(phone)
            .await?
            .ok_or(RecoveryError::CodeNotFound)?;

        if record.is_expired(self.clock.now()) {
            self.ledger.remove(phone).await?;
            return Err(RecoveryError::CodeExpired);
        }

        if !self.crypto.verify_password(code, &record.code_hash)? {
            // A well-formed but wrong value is indistinguishable from a code
            // that was never issued.
            return Err(RecoveryError::CodeNotFound);
        }

        Ok(record)
    }
}

fn check_code_format(code: &str) -> Result<(), RecoveryError> {
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(RecoveryError::InvalidFormat)
    }
}
