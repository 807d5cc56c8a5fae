mod config;
mod controllers;
mod models;
mod service;
mod store;
#[cfg(test)]
mod testutil;
mod utils;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use crate::config::config::Config;
use crate::config::crypto::CryptoService;
use crate::config::routes::routes;
use crate::service::recovery_service::{RecoveryPolicy, RecoveryService};
use crate::service::sms_service::HttpSmsGateway;
use crate::store::postgres::{PgCredentialStore, PgOtpLedger};
use crate::utils::clock::SystemClock;
use crate::utils::phone::DialingPlan;

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let pool = config.db_pool().await?;

    let policy = RecoveryPolicy {
        platform_name: config.platform_name.clone(),
        dialing_plan: DialingPlan::new(&config.country_code, &config.trunk_prefix),
        allow_unconfirmed_delivery: config.allow_unconfirmed_delivery,
    };
    let recovery = web::Data::new(RecoveryService::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(PgOtpLedger::new(pool)),
        Arc::new(HttpSmsGateway::new(&config)?),
        Arc::new(SystemClock),
        CryptoService::default(),
        policy,
    ));

    let bind_addr = format!("{}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(recovery.clone())
            .configure(routes)
    })
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}
