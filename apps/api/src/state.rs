use postroom_application::{EnquiryService, OtpService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub enquiry_service: EnquiryService,
    pub otp_service: OtpService,
}
