use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use eyre::{Result, WrapErr};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::account::Account;
use crate::models::otp_code::{OtpCode, RATE_LIMIT_SECS};
use crate::store::{CredentialStore, IssuanceOutcome, OtpLedger};

pub struct PgOtpLedger {
    pool: PgPool,
}

impl PgOtpLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpLedger for PgOtpLedger {
    async fn issue(
        &self,
        phone: &str,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuanceOutcome> {
        // Conditional upsert: the unique key on phone_number serializes
        // concurrent issuance, and the WHERE clause makes "replace" fail when
        // the existing row is still inside the rate window. Zero rows
        // affected means the window is still closed.
        let cutoff = now - Duration::seconds(RATE_LIMIT_SECS);
        let result = sqlx::query(
            r#"
                INSERT INTO otp_codes (phone_number, code_hash, created_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (phone_number) DO UPDATE
                SET code_hash = EXCLUDED.code_hash,
                    created_at = EXCLUDED.created_at
                WHERE otp_codes.created_at <= $4
            "#,
        )
        .bind(phone)
        .bind(code_hash)
        .bind(now)
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .wrap_err("Failed to issue OTP")?;

        if result.rows_affected() == 0 {
            Ok(IssuanceOutcome::RateLimited)
        } else {
            Ok(IssuanceOutcome::Issued)
        }
    }

    async fn find(&self, phone: &str) -> Result<Option<OtpCode>> {
        sqlx::query_as::<_, OtpCode>(
            r#"
                SELECT phone_number, code_hash, created_at
                FROM otp_codes
                WHERE phone_number = $1
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
        .wrap_err("Failed to fetch OTP record")
    }

    async fn remove(&self, phone: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE phone_number = $1")
            .bind(phone)
            .execute(&self.pool)
            .await
            .wrap_err("Failed to delete OTP record")?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>> {
        sqlx::query_as::<_, Account>(
            r#"
                SELECT id, phone_number, password_hash, status, profile_id,
                       created_at, updated_at
                FROM accounts
                WHERE phone_number = $1
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
        .wrap_err("Failed to fetch account")
    }

    async fn update_password(&self, account_id: Uuid, password_hash: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
                UPDATE accounts
                SET password_hash = $2,
                    updated_at = NOW()
                WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .wrap_err("Failed to update account password")?;

        if result.rows_affected() != 1 {
            return Err(eyre::eyre!("Account {account_id} no longer exists"));
        }
        Ok(())
    }
}
