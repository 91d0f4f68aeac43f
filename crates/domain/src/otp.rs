//! One-time passcode types.

use postroom_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Smallest value a one-time passcode can take.
pub const OTP_CODE_MIN: u32 = 100_000;

/// Largest value a one-time passcode can take.
pub const OTP_CODE_MAX: u32 = 999_999;

/// A six-digit numeric one-time passcode.
///
/// Codes are always in `[100000, 999999]`, so the string form never carries
/// a leading zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OtpCode(String);

impl OtpCode {
    /// Creates a passcode from a numeric value.
    pub fn from_value(value: u32) -> AppResult<Self> {
        if !(OTP_CODE_MIN..=OTP_CODE_MAX).contains(&value) {
            return Err(AppError::Validation(format!(
                "one-time passcode must be between {OTP_CODE_MIN} and {OTP_CODE_MAX}"
            )));
        }

        Ok(Self(value.to_string()))
    }

    /// Parses a passcode from its string form.
    pub fn parse(value: &str) -> AppResult<Self> {
        let numeric = value.parse::<u32>().map_err(|_| {
            AppError::Validation("one-time passcode must be a six-digit number".to_owned())
        })?;

        Self::from_value(numeric)
    }

    /// Returns the six-digit string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for OtpCode {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}
