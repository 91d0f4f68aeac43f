//! Redis-backed rate limit repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use postroom_application::{RateLimitDecision, RateLimitRepository};
use postroom_core::{AppError, AppResult};
use redis::Script;

// Reads the counter and increments it only while below the ceiling, in one
// script so concurrent requests for the same key serialize inside Redis.
// A fresh counter gets the window as its TTL; expiry is the reset.
const INCREMENT_IF_BELOW_SCRIPT: &str = r#"
local key = KEYS[1]
local ceiling = tonumber(ARGV[1])
local window = tonumber(ARGV[2])

local count = tonumber(redis.call('GET', key) or '0')
if count >= ceiling then
  return {0, count}
end

count = redis.call('INCR', key)
if redis.call('TTL', key) < 0 then
  redis.call('EXPIRE', key, window)
end

return {1, count}
"#;

/// Redis implementation of the rate limit repository port.
#[derive(Clone)]
pub struct RedisRateLimitRepository {
    client: redis::Client,
    key_prefix: String,
}

impl RedisRateLimitRepository {
    /// Creates a repository with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }
}

#[async_trait]
impl RateLimitRepository for RedisRateLimitRepository {
    async fn increment_if_below(
        &self,
        key: &str,
        ceiling: i32,
        window_seconds: i64,
    ) -> AppResult<RateLimitDecision> {
        if window_seconds <= 0 {
            return Err(AppError::Validation(
                "window_seconds must be greater than zero".to_owned(),
            ));
        }

        let redis_key = self.key_for(key);
        let window = i32::try_from(window_seconds).map_err(|error| {
            AppError::Validation(format!("invalid rate limit window duration: {error}"))
        })?;

        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))?;

        let script = Script::new(INCREMENT_IF_BELOW_SCRIPT);
        let (allowed, count): (i64, i64) = script
            .key(redis_key)
            .arg(ceiling)
            .arg(window)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to record redis rate limit attempt: {error}"
                ))
            })?;

        if allowed == 0 {
            return Ok(RateLimitDecision::Rejected);
        }

        let attempt_count = i32::try_from(count)
            .map_err(|error| AppError::Internal(format!("invalid redis attempt count: {error}")))?;

        Ok(RateLimitDecision::Allowed { attempt_count })
    }

    async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        // Redis rate limit keys expire automatically via TTL.
        Ok(0)
    }
}
