//! PostgreSQL-backed passcode repository using the `otp_codes` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use postroom_application::OtpRepository;
use postroom_core::{AppError, AppResult};
use postroom_domain::OtpCode;

/// PostgreSQL implementation of the passcode repository port.
#[derive(Clone)]
pub struct PostgresOtpRepository {
    pool: PgPool,
}

impl PostgresOtpRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpRepository for PostgresOtpRepository {
    async fn store_code(
        &self,
        email: &str,
        code: &OtpCode,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO otp_codes (email, code, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(email)
        .bind(code.as_str())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to store otp code: {error}")))?;

        Ok(())
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM otp_codes
            WHERE expires_at < $1
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete expired otp codes: {error}")))?;

        Ok(result.rows_affected())
    }
}
