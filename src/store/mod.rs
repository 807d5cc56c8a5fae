//! Persistence contracts for the recovery flow. The recovery service receives
//! these as handles at construction; nothing in the flow touches a global
//! connection.

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::Result;
use uuid::Uuid;

use crate::models::account::Account;
use crate::models::otp_code::OtpCode;

/// Outcome of an issuance attempt. The rate-limit decision happens inside the
/// ledger, atomically with the write, so two concurrent requests can never
/// both observe "no recent code" and both pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceOutcome {
    Issued,
    RateLimited,
}

/// Pending one-time codes, keyed by phone number. Single source of truth for
/// rate limiting, expiry and single use. Rows are owned exclusively by the
/// recovery service; no other component creates or deletes them.
#[async_trait]
pub trait OtpLedger: Send + Sync {
    /// Atomically replaces any prior code for `phone` with a fresh one,
    /// unless a code was already created within the rate-limit window.
    async fn issue(
        &self,
        phone: &str,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuanceOutcome>;

    async fn find(&self, phone: &str) -> Result<Option<OtpCode>>;

    /// Removes the code for `phone`. Returns whether a row existed; removing
    /// an already-absent row is not an error, so concurrent consumers fail
    /// cleanly instead of faulting.
    async fn remove(&self, phone: &str) -> Result<bool>;
}

/// Account lookup and password mutation, assumed strongly consistent.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>>;

    async fn update_password(&self, account_id: Uuid, password_hash: &str) -> Result<()>;
}
