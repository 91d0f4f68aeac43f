pub mod enquiry;
pub mod health;
pub mod otp;
