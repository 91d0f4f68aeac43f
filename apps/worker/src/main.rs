//! Postroom cleanup worker runtime.
//!
//! Periodically purges expired one-time passcodes and stale rate-limit
//! counters. The Redis rate-limit store expires keys on its own; this loop
//! only matters for the Postgres-backed store and the `otp_codes` table.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use postroom_application::{OtpRepository, RateLimitService};
use postroom_core::AppError;
use postroom_infrastructure::{PostgresOtpRepository, PostgresRateLimitRepository};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    cleanup_interval_seconds: u64,
}

impl WorkerConfig {
    fn load() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Validation("DATABASE_URL is required".to_owned()))?;

        let cleanup_interval_seconds = env::var("CLEANUP_INTERVAL_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(3600);

        Ok(Self {
            database_url,
            cleanup_interval_seconds,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    let rate_limit_service =
        RateLimitService::new(Arc::new(PostgresRateLimitRepository::new(pool.clone())));
    let otp_repository: Arc<dyn OtpRepository> = Arc::new(PostgresOtpRepository::new(pool));

    info!(
        cleanup_interval_seconds = config.cleanup_interval_seconds,
        "postroom-worker started"
    );

    loop {
        match rate_limit_service.cleanup().await {
            Ok(removed) => info!(removed, "purged stale rate limit entries"),
            Err(error) => warn!(error = %error, "rate limit cleanup failed"),
        }

        match otp_repository.delete_expired(Utc::now()).await {
            Ok(removed) => info!(removed, "purged expired otp codes"),
            Err(error) => warn!(error = %error, "otp cleanup failed"),
        }

        tokio::time::sleep(Duration::from_secs(config.cleanup_interval_seconds)).await;
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
