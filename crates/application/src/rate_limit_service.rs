//! Rate limiting port and application service.
//!
//! Implements a keyed counter with a fixed ceiling and a rolling 24-hour
//! reset window. The counter mutation is a single atomic
//! increment-if-below-ceiling operation at the backing store, so two
//! concurrent requests for the same key cannot both slip past the ceiling.
//! Window expiry is the store's responsibility (Redis TTL or a SQL window
//! comparison); this service holds no clock logic of its own.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use postroom_core::{AppError, AppResult};

/// Seconds in the rolling reset window shared by every rule.
const WINDOW_SECONDS: i64 = 24 * 60 * 60;

/// Outcome of a single rate-limit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The attempt was recorded and is within the ceiling.
    Allowed {
        /// Number of attempts in the current window, including this one.
        attempt_count: i32,
    },
    /// The ceiling was already reached; nothing was written.
    Rejected,
}

/// Repository port for rate limit persistence.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Atomically increments the counter for `key` unless it has reached
    /// `ceiling`.
    ///
    /// Creates the counter at 1 on first use. Exactly one store write happens
    /// per `Allowed` outcome and none on `Rejected`. A fresh counter expires
    /// `window_seconds` after creation.
    async fn increment_if_below(
        &self,
        key: &str,
        ceiling: i32,
        window_seconds: i64,
    ) -> AppResult<RateLimitDecision>;

    /// Removes entries whose window started before the given cutoff.
    ///
    /// Stores with native key expiry may implement this as a no-op.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Configuration for a rate limit rule.
#[derive(Debug, Clone)]
pub struct RateLimitRule {
    /// Category name used as the key prefix (e.g. "enquiry", "otp").
    pub category: String,
    /// Maximum number of attempts allowed in the window.
    pub ceiling: i32,
    /// Window duration in seconds.
    pub window_seconds: i64,
    /// Message returned to the client when the ceiling is reached.
    pub rejection_message: String,
}

impl RateLimitRule {
    /// Creates a rate limit rule with the shared 24-hour window.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        ceiling: i32,
        rejection_message: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            ceiling,
            window_seconds: WINDOW_SECONDS,
            rejection_message: rejection_message.into(),
        }
    }

    /// Rule for enquiry submissions, keyed by client identity.
    #[must_use]
    pub fn enquiry() -> Self {
        Self::new(
            "enquiry",
            20,
            "You exceeded the limit. Try again after 24 hours.",
        )
    }

    /// Rule for one-time passcode requests, keyed by email address.
    #[must_use]
    pub fn otp() -> Self {
        Self::new(
            "otp",
            3,
            "You exceeded the OTP limit. Try again after 24 hours.",
        )
    }
}

/// Application service for rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>) -> Self {
        Self { repository }
    }

    /// Records an attempt for `key` under the given rule.
    ///
    /// Returns `Ok(())` when the attempt is within the ceiling, or
    /// `Err(AppError::RateLimited)` when it was rejected. The store key is
    /// `"{category}:{key}"` so the two limiter categories never collide.
    pub async fn enforce(&self, rule: &RateLimitRule, key: &str) -> AppResult<()> {
        if key.trim().is_empty() {
            return Err(AppError::Validation(
                "rate limit key must not be empty".to_owned(),
            ));
        }

        let composite_key = format!("{}:{key}", rule.category);
        let decision = self
            .repository
            .increment_if_below(&composite_key, rule.ceiling, rule.window_seconds)
            .await?;

        match decision {
            RateLimitDecision::Allowed { .. } => Ok(()),
            RateLimitDecision::Rejected => {
                Err(AppError::RateLimited(rule.rejection_message.clone()))
            }
        }
    }

    /// Removes expired rate limit entries. Intended for periodic cleanup.
    pub async fn cleanup(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::seconds(WINDOW_SECONDS);
        self.repository.cleanup_expired(cutoff).await
    }
}
