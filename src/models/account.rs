use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Locked,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,

    /// Normalized international phone number. Globally unique, never mutated.
    pub phone_number: String,

    #[serde(skip_serializing)] //never leaves the backend in API responses
    pub password_hash: String,

    pub status: AccountStatus,

    /// Owning profile (memberships, sessions, nutrition live there).
    pub profile_id: Uuid,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}
