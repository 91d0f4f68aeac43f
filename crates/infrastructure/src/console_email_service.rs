//! Console email service for development. Writes emails to tracing output
//! instead of talking to an SMTP relay.

use async_trait::async_trait;
use postroom_application::EmailService;
use postroom_core::AppResult;
use tracing::info;

/// Development email service that logs emails instead of sending them.
#[derive(Clone, Default)]
pub struct ConsoleEmailService;

impl ConsoleEmailService {
    /// Creates a new console email service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailService for ConsoleEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        _html_body: Option<&str>,
    ) -> AppResult<()> {
        info!(to, subject, "console email transport\n{text_body}");

        Ok(())
    }
}
