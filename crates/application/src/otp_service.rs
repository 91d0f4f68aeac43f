//! One-time passcode issuance flows.
//!
//! Two entry points share one pipeline: issue for a brand-new account and
//! reissue for an existing one. They differ only in the user-existence
//! precondition. Codes are uniformly random six-digit numbers, persisted
//! before the email leaves, and throttled per email address. A code that was
//! persisted is not rolled back when the email transport fails afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use postroom_core::{AppError, AppResult};
use postroom_domain::{OTP_CODE_MAX, OTP_CODE_MIN, OtpCode};

use super::email::EmailService;
use super::rate_limit_service::{RateLimitRule, RateLimitService};

/// How long an issued passcode stays valid, in minutes.
pub const OTP_VALIDITY_MINUTES: i64 = 5;

/// Read-only port onto the account directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns whether an account exists for the given email address.
    async fn is_registered(&self, email: &str) -> AppResult<bool>;
}

/// Repository port for passcode persistence.
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Stores a freshly issued passcode.
    ///
    /// Multiple live codes per email may coexist; verification picks among
    /// them elsewhere.
    async fn store_code(
        &self,
        email: &str,
        code: &OtpCode,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Removes codes that expired before the given cutoff.
    async fn delete_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Application service for issuing one-time passcodes by email.
#[derive(Clone)]
pub struct OtpService {
    user_directory: Arc<dyn UserDirectory>,
    otp_repository: Arc<dyn OtpRepository>,
    email_service: Arc<dyn EmailService>,
    rate_limit_service: RateLimitService,
}

impl OtpService {
    /// Creates a new OTP service.
    #[must_use]
    pub fn new(
        user_directory: Arc<dyn UserDirectory>,
        otp_repository: Arc<dyn OtpRepository>,
        email_service: Arc<dyn EmailService>,
        rate_limit_service: RateLimitService,
    ) -> Self {
        Self {
            user_directory,
            otp_repository,
            email_service,
            rate_limit_service,
        }
    }

    /// Issues a passcode for an email address that must not be registered yet.
    pub async fn issue_for_new_account(&self, email: &str) -> AppResult<()> {
        let email = required_email(email)?;

        if self.user_directory.is_registered(email).await? {
            return Err(AppError::Validation(
                "an account with this email address already exists".to_owned(),
            ));
        }

        self.issue(email).await
    }

    /// Reissues a passcode for an email address that must already be registered.
    pub async fn reissue_for_account(&self, email: &str) -> AppResult<()> {
        let email = required_email(email)?;

        if !self.user_directory.is_registered(email).await? {
            return Err(AppError::Validation(
                "this email address is not registered".to_owned(),
            ));
        }

        self.issue(email).await
    }

    /// Removes expired passcodes. Intended for periodic cleanup.
    pub async fn purge_expired(&self) -> AppResult<u64> {
        self.otp_repository.delete_expired(Utc::now()).await
    }

    async fn issue(&self, email: &str) -> AppResult<()> {
        self.rate_limit_service
            .enforce(&RateLimitRule::otp(), email)
            .await?;

        let code = generate_code()?;
        let expires_at = Utc::now() + chrono::Duration::minutes(OTP_VALIDITY_MINUTES);
        self.otp_repository
            .store_code(email, &code, expires_at)
            .await?;

        let subject = "Your verification code";
        let text_body = format!(
            "Your one-time passcode is {code}.\n\n\
             The code expires in {OTP_VALIDITY_MINUTES} minutes. Do not share it with anyone.\n\n\
             If you did not request this code, you can safely ignore this email."
        );

        self.email_service
            .send_email(email, subject, &text_body, None)
            .await
    }
}

fn required_email(email: &str) -> AppResult<&str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("email is required".to_owned()));
    }

    Ok(email)
}

/// Draws a uniformly random passcode in `[100000, 999999]`.
///
/// Rejection sampling keeps the distribution uniform; a plain modulo over
/// the full `u32` range would bias the low codes.
fn generate_code() -> AppResult<OtpCode> {
    const RANGE: u32 = OTP_CODE_MAX - OTP_CODE_MIN + 1;
    const LIMIT: u32 = u32::MAX - (u32::MAX % RANGE);

    loop {
        let mut bytes = [0u8; 4];
        getrandom::fill(&mut bytes).map_err(|error| {
            AppError::Internal(format!("failed to read system randomness: {error}"))
        })?;

        let value = u32::from_le_bytes(bytes);
        if value < LIMIT {
            return OtpCode::from_value(OTP_CODE_MIN + value % RANGE);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use postroom_core::{AppError, AppResult};
    use postroom_domain::OtpCode;

    use super::super::email::EmailService;
    use super::super::rate_limit_service::{
        RateLimitDecision, RateLimitRepository, RateLimitService,
    };
    use super::{OtpRepository, OtpService, UserDirectory, generate_code};

    struct TestUserDirectory {
        registered: bool,
    }

    #[async_trait]
    impl UserDirectory for TestUserDirectory {
        async fn is_registered(&self, _email: &str) -> AppResult<bool> {
            Ok(self.registered)
        }
    }

    #[derive(Default)]
    struct TestOtpRepo {
        stored: Mutex<Vec<(String, String, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl OtpRepository for TestOtpRepo {
        async fn store_code(
            &self,
            email: &str,
            code: &OtpCode,
            expires_at: DateTime<Utc>,
        ) -> AppResult<()> {
            self.stored
                .lock()
                .map_err(|error| {
                    AppError::Internal(format!("failed to lock repo state: {error}"))
                })?
                .push((email.to_owned(), code.to_string(), expires_at));
            Ok(())
        }

        async fn delete_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct TestRateLimitRepo {
        counters: Mutex<HashMap<String, i32>>,
    }

    impl TestRateLimitRepo {
        fn count(&self, key: &str) -> i32 {
            self.counters
                .lock()
                .ok()
                .and_then(|guard| guard.get(key).copied())
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl RateLimitRepository for TestRateLimitRepo {
        async fn increment_if_below(
            &self,
            key: &str,
            ceiling: i32,
            _window_seconds: i64,
        ) -> AppResult<RateLimitDecision> {
            let mut counters = self
                .counters
                .lock()
                .map_err(|error| AppError::Internal(format!("failed to lock counters: {error}")))?;

            let count = counters.entry(key.to_owned()).or_insert(0);
            if *count >= ceiling {
                return Ok(RateLimitDecision::Rejected);
            }

            *count += 1;
            Ok(RateLimitDecision::Allowed {
                attempt_count: *count,
            })
        }

        async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct TestEmailService {
        sent: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailService for TestEmailService {
        async fn send_email(
            &self,
            to: &str,
            subject: &str,
            text_body: &str,
            _html_body: Option<&str>,
        ) -> AppResult<()> {
            if self.fail {
                return Err(AppError::Internal("smtp connection refused".to_owned()));
            }

            self.sent
                .lock()
                .map_err(|error| {
                    AppError::Internal(format!("failed to lock email service state: {error}"))
                })?
                .push((to.to_owned(), subject.to_owned(), text_body.to_owned()));
            Ok(())
        }
    }

    struct Harness {
        otp_repo: Arc<TestOtpRepo>,
        rate_repo: Arc<TestRateLimitRepo>,
        email: Arc<TestEmailService>,
        service: OtpService,
    }

    fn harness(registered: bool, email_fails: bool) -> Harness {
        let otp_repo = Arc::new(TestOtpRepo::default());
        let rate_repo = Arc::new(TestRateLimitRepo::default());
        let email = Arc::new(TestEmailService {
            fail: email_fails,
            ..TestEmailService::default()
        });

        let service = OtpService::new(
            Arc::new(TestUserDirectory { registered }),
            otp_repo.clone(),
            email.clone(),
            RateLimitService::new(rate_repo.clone()),
        );

        Harness {
            otp_repo,
            rate_repo,
            email,
            service,
        }
    }

    #[tokio::test]
    async fn issue_stores_code_and_sends_email_to_requester() {
        let harness = harness(false, false);

        let result = harness
            .service
            .issue_for_new_account("new.user@example.com")
            .await;
        assert!(result.is_ok());

        let stored = harness
            .otp_repo
            .stored
            .lock()
            .ok()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, "new.user@example.com");
        assert_eq!(stored[0].1.len(), 6);

        let sent = harness
            .email
            .sent
            .lock()
            .ok()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "new.user@example.com");
        assert!(sent[0].2.contains(&stored[0].1));
    }

    #[tokio::test]
    async fn issue_rejects_missing_email_before_any_side_effect() {
        let harness = harness(false, false);

        let result = harness.service.issue_for_new_account("   ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(harness.rate_repo.count("otp:"), 0);
    }

    #[tokio::test]
    async fn issue_rejects_already_registered_email() {
        let harness = harness(true, false);

        let result = harness
            .service
            .issue_for_new_account("taken@example.com")
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(harness.rate_repo.count("otp:taken@example.com"), 0);
        let sent = harness
            .email
            .sent
            .lock()
            .ok()
            .map(|guard| guard.len())
            .unwrap_or(0);
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn reissue_rejects_unregistered_email() {
        let harness = harness(false, false);

        let result = harness
            .service
            .reissue_for_account("nobody@example.com")
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(harness.rate_repo.count("otp:nobody@example.com"), 0);
        let sent = harness
            .email
            .sent
            .lock()
            .ok()
            .map(|guard| guard.len())
            .unwrap_or(0);
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn fourth_request_for_one_email_is_rate_limited() {
        let harness = harness(true, false);

        for attempt in 1..=3 {
            let result = harness
                .service
                .reissue_for_account("user@example.com")
                .await;
            assert!(result.is_ok(), "attempt {attempt} should be allowed");
        }

        let rejected = harness.service.reissue_for_account("user@example.com").await;
        assert!(matches!(rejected, Err(AppError::RateLimited(_))));
        assert_eq!(harness.rate_repo.count("otp:user@example.com"), 3);
    }

    #[tokio::test]
    async fn transport_failure_keeps_the_persisted_code() {
        let harness = harness(false, true);

        let result = harness
            .service
            .issue_for_new_account("new.user@example.com")
            .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        let stored = harness
            .otp_repo
            .stored
            .lock()
            .ok()
            .map(|guard| guard.len())
            .unwrap_or(0);
        assert_eq!(stored, 1);
    }

    #[test]
    fn generated_codes_stay_in_the_six_digit_range() {
        for _ in 0..500 {
            let code = generate_code().map(|code| code.to_string()).unwrap_or_default();
            assert_eq!(code.len(), 6);
            let numeric = code.parse::<u32>().unwrap_or(0);
            assert!((100_000..=999_999).contains(&numeric));
        }
    }
}
