use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

/// How long a code stays valid after issuance.
pub const CODE_TTL_SECS: i64 = 5 * 60;

/// Rolling window in which at most one issuance per phone number is allowed.
pub const RATE_LIMIT_SECS: i64 = 60;

/// A pending one-time code. At most one row per phone number exists at any
/// instant; absence means consumed or never issued.
#[derive(Debug, Clone, FromRow)]
pub struct OtpCode {
    pub phone_number: String,

    /// Argon2 hash of the 6-digit value. The plaintext is never persisted.
    pub code_hash: String,

    pub created_at: DateTime<Utc>,
}

impl OtpCode {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(CODE_TTL_SECS)
    }

    /// Expiry is implicit in the timestamp, not a stored flag. A row past its
    /// window is invalid even if it was never deleted.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}
