//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod enquiry;
mod otp;

pub use enquiry::{ClientIdentity, Enquiry};
pub use otp::{OTP_CODE_MAX, OTP_CODE_MIN, OtpCode};
