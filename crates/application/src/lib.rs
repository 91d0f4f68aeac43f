//! Application services and ports.

#![forbid(unsafe_code)]

mod email;
mod enquiry_service;
mod otp_service;
mod rate_limit_service;

pub use email::EmailService;
pub use enquiry_service::EnquiryService;
pub use otp_service::{OTP_VALIDITY_MINUTES, OtpRepository, OtpService, UserDirectory};
pub use rate_limit_service::{
    RateLimitDecision, RateLimitRepository, RateLimitRule, RateLimitService,
};
