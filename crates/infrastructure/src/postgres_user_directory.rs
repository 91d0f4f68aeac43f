//! PostgreSQL-backed account directory lookup.

use async_trait::async_trait;
use sqlx::PgPool;

use postroom_application::UserDirectory;
use postroom_core::{AppError, AppResult};

/// PostgreSQL implementation of the user directory port.
#[derive(Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Creates a directory backed by the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn is_registered(&self, email: &str) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users WHERE LOWER(email) = LOWER($1)
            )
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up user by email: {error}")))?;

        Ok(exists)
    }
}
