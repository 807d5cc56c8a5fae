use std::time::Duration;

use color_eyre::Result;
use dotenv::dotenv;
use eyre::WrapErr;
use serde::Deserialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub platform_name: String,

    // SMS gateway credentials and sender identity come from deployment
    // secrets, never from code.
    pub sms_api_url: String,
    pub sms_account_id: String,
    pub sms_auth_token: String,
    pub sms_sender_id: String,
    #[serde(default = "default_sms_timeout_secs")]
    pub sms_timeout_secs: u64,

    /// Dialing rules for the deployment's locale, e.g. "+84" with trunk
    /// prefix "0".
    pub country_code: String,
    #[serde(default = "default_trunk_prefix")]
    pub trunk_prefix: String,

    /// Degraded mode: keep an issued recovery code usable even when the SMS
    /// gateway could not confirm delivery. Production stays `false`.
    #[serde(default)]
    pub allow_unconfirmed_delivery: bool,
}

fn default_sms_timeout_secs() -> u64 {
    10
}

fn default_trunk_prefix() -> String {
    "0".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        info!("Initializing configuration");
        let settings = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .wrap_err("Building configuration")?;

        settings
            .try_deserialize()
            .wrap_err("loading configuration from environment")
    }

    pub async fn db_pool(&self) -> Result<PgPool> {
        info!("Initializing database pool");
        PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&self.database_url)
            .await
            .wrap_err("Creating database pool")
    }
}
