//! In-memory doubles for the persistence and delivery contracts, plus a
//! manual clock for deterministic expiry tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use eyre::Result;
use uuid::Uuid;

use crate::models::account::{Account, AccountStatus};
use crate::models::otp_code::{OtpCode, RATE_LIMIT_SECS};
use crate::service::sms_service::{DeliveryReference, SmsError, SmsGateway};
use crate::store::{CredentialStore, IssuanceOutcome, OtpLedger};
use crate::utils::clock::Clock;

#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<HashMap<String, OtpCode>>,
}

impl MemoryLedger {
    pub fn active_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl OtpLedger for MemoryLedger {
    async fn issue(
        &self,
        phone: &str,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuanceOutcome> {
        // Single lock covers check and write, mirroring the conditional
        // upsert the Postgres ledger uses.
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.get(phone) {
            if now - existing.created_at < Duration::seconds(RATE_LIMIT_SECS) {
                return Ok(IssuanceOutcome::RateLimited);
            }
        }
        rows.insert(
            phone.to_string(),
            OtpCode {
                phone_number: phone.to_string(),
                code_hash: code_hash.to_string(),
                created_at: now,
            },
        );
        Ok(IssuanceOutcome::Issued)
    }

    async fn find(&self, phone: &str) -> Result<Option<OtpCode>> {
        Ok(self.rows.lock().unwrap().get(phone).cloned())
    }

    async fn remove(&self, phone: &str) -> Result<bool> {
        Ok(self.rows.lock().unwrap().remove(phone).is_some())
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl MemoryCredentialStore {
    pub fn insert(&self, phone: &str, password_hash: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.accounts.lock().unwrap().insert(
            phone.to_string(),
            Account {
                id,
                phone_number: phone.to_string(),
                password_hash: password_hash.to_string(),
                status: AccountStatus::Active,
                profile_id: Uuid::new_v4(),
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn password_hash(&self, phone: &str) -> Option<String> {
        self.accounts
            .lock()
            .unwrap()
            .get(phone)
            .map(|account| account.password_hash.clone())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>> {
        Ok(self.accounts.lock().unwrap().get(phone).cloned())
    }

    async fn update_password(&self, account_id: Uuid, password_hash: &str) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .values_mut()
            .find(|account| account.id == account_id)
            .ok_or_else(|| eyre::eyre!("no account with id {account_id}"))?;
        account.password_hash = password_hash.to_string();
        account.updated_at = Utc::now();
        Ok(())
    }
}

/// Records every send and fails on demand.
#[derive(Default)]
pub struct StubGateway {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_with: Mutex<Option<SmsError>>,
}

impl StubGateway {
    pub fn failing(error: SmsError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Mutex::new(Some(error)),
        }
    }

    /// The 6-digit code from the most recently delivered message body.
    pub fn last_code(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let (_, body) = sent.last()?;
        body.split(|c: char| !c.is_ascii_digit())
            .find(|run| run.len() == 6)
            .map(str::to_string)
    }

    pub fn last_recipient(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(to, _)| to.clone())
    }
}

#[async_trait]
impl SmsGateway for StubGateway {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReference, SmsError> {
        if let Some(error) = self.fail_with.lock().unwrap().clone() {
            return Err(error);
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.to_string(), body.to_string()));
        Ok(DeliveryReference::confirmed(format!("SM{:08}", sent.len())))
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
