//! PostgreSQL-backed rate limit repository using the `rate_limits` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use postroom_application::{RateLimitDecision, RateLimitRepository};
use postroom_core::{AppError, AppResult};

/// PostgreSQL implementation of the rate limit repository port.
#[derive(Clone)]
pub struct PostgresRateLimitRepository {
    pool: PgPool,
}

impl PostgresRateLimitRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitRepository for PostgresRateLimitRepository {
    async fn increment_if_below(
        &self,
        key: &str,
        ceiling: i32,
        window_seconds: i64,
    ) -> AppResult<RateLimitDecision> {
        // Conditional UPSERT in one statement: a fresh key starts at 1, an
        // expired window resets to 1, a live window below the ceiling
        // increments. At the ceiling the DO UPDATE row filter excludes the
        // row, no write happens, and the statement returns nothing.
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            INSERT INTO rate_limits AS r (key, attempt_count, window_started_at)
            VALUES ($1, 1, now())
            ON CONFLICT (key) DO UPDATE
            SET
                attempt_count = CASE
                    WHEN r.window_started_at + make_interval(secs => $2::float8) < now()
                    THEN 1
                    ELSE r.attempt_count + 1
                END,
                window_started_at = CASE
                    WHEN r.window_started_at + make_interval(secs => $2::float8) < now()
                    THEN now()
                    ELSE r.window_started_at
                END
            WHERE r.window_started_at + make_interval(secs => $2::float8) < now()
               OR r.attempt_count < $3
            RETURNING attempt_count
            "#,
        )
        .bind(key)
        .bind(window_seconds as f64)
        .bind(ceiling)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to record rate limit attempt: {error}"))
        })?;

        Ok(match row {
            Some(row) => RateLimitDecision::Allowed {
                attempt_count: row.attempt_count,
            },
            None => RateLimitDecision::Rejected,
        })
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM rate_limits
            WHERE window_started_at < $1
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to cleanup expired rate limits: {error}"))
        })?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AttemptRow {
    attempt_count: i32,
}
