//! Enquiry submission flow.

use std::sync::Arc;

use postroom_core::AppResult;
use postroom_domain::{ClientIdentity, Enquiry};

use super::email::EmailService;
use super::rate_limit_service::{RateLimitRule, RateLimitService};

/// Application service for web-form enquiry submissions.
///
/// Throttles submissions per client identity and forwards each accepted
/// enquiry as a notification email to a fixed operator address.
#[derive(Clone)]
pub struct EnquiryService {
    email_service: Arc<dyn EmailService>,
    rate_limit_service: RateLimitService,
    operator_address: String,
}

impl EnquiryService {
    /// Creates a new enquiry service.
    #[must_use]
    pub fn new(
        email_service: Arc<dyn EmailService>,
        rate_limit_service: RateLimitService,
        operator_address: impl Into<String>,
    ) -> Self {
        Self {
            email_service,
            rate_limit_service,
            operator_address: operator_address.into(),
        }
    }

    /// Submits a validated enquiry on behalf of the given client identity.
    ///
    /// Rejects with `AppError::RateLimited` once the identity has used up its
    /// daily allowance; transport failures surface as `AppError::Internal`.
    pub async fn submit(&self, enquiry: &Enquiry, identity: &ClientIdentity) -> AppResult<()> {
        self.rate_limit_service
            .enforce(&RateLimitRule::enquiry(), identity.as_str())
            .await?;

        let subject = "New website enquiry";
        let text_body = format!(
            "A new enquiry was submitted via the website.\n\n\
             Name: {}\n\
             Email: {}\n\
             Phone: {}\n\
             Address: {}\n\
             Enquiry type: {}\n\n\
             Message:\n{}\n",
            enquiry.name(),
            enquiry.email(),
            enquiry.phone(),
            enquiry.address(),
            enquiry.kind(),
            enquiry.message(),
        );

        self.email_service
            .send_email(&self.operator_address, subject, &text_body, None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use postroom_core::{AppError, AppResult};
    use postroom_domain::{ClientIdentity, Enquiry};

    use super::super::rate_limit_service::{
        RateLimitDecision, RateLimitRepository, RateLimitService,
    };
    use super::{EmailService, EnquiryService};

    #[derive(Default)]
    struct TestRateLimitRepo {
        counters: Mutex<HashMap<String, i32>>,
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

    fn service(
        email: Arc<TestEmailService>,
        repo: Arc<TestRateLimitRepo>,
    ) -> EnquiryService {
        EnquiryService::new(
            email,
            RateLimitService::new(repo),
            "operator@example.com",
        )
    }

    fn sample_enquiry() -> Enquiry {
        Enquiry::new(
            "Ada Lovelace",
            "ada@example.com",
            "555-0100",
            "1 Main St",
            "general",
            "I would like to know more.",
        )
        .unwrap_or_else(|_| unreachable!("sample enquiry is valid"))
    }

    fn sample_identity() -> ClientIdentity {
        ClientIdentity::derive(Some("10.0.0.1, 192.168.1.5"), "ignored")
            .unwrap_or_else(|_| unreachable!("sample identity is valid"))
    }

    #[tokio::test]
    async fn submit_sends_notification_to_operator_address() {
        let email = Arc::new(TestEmailService::default());
        let repo = Arc::new(TestRateLimitRepo::default());
        let service = service(email.clone(), repo);

        let result = service.submit(&sample_enquiry(), &sample_identity()).await;
        assert!(result.is_ok());

        let sent = email
            .sent
            .lock()
            .ok()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "operator@example.com");
        assert!(sent[0].2.contains("Ada Lovelace"));
        assert!(sent[0].2.contains("I would like to know more."));
    }

    #[tokio::test]
    async fn twenty_first_submission_from_one_identity_is_rate_limited() {
        let email = Arc::new(TestEmailService::default());
        let repo = Arc::new(TestRateLimitRepo::default());
        let service = service(email.clone(), repo);

        for attempt in 1..=20 {
            let result = service.submit(&sample_enquiry(), &sample_identity()).await;
            assert!(result.is_ok(), "attempt {attempt} should be allowed");
        }

        let rejected = service.submit(&sample_enquiry(), &sample_identity()).await;
        assert!(matches!(rejected, Err(AppError::RateLimited(_))));

        let sent = email.sent.lock().ok().map(|guard| guard.len()).unwrap_or(0);
        assert_eq!(sent, 20);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_internal_error() {
        let email = Arc::new(TestEmailService {
            fail: true,
            ..TestEmailService::default()
        });
        let repo = Arc::new(TestRateLimitRepo::default());
        let service = service(email, repo);

        let result = service.submit(&sample_enquiry(), &sample_identity()).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
