use serde::{Deserialize, Serialize};

/// Incoming payload for a web-form enquiry.
///
/// Missing fields deserialize as empty strings and are rejected by domain
/// validation with a 400, matching the presence-only contract.
#[derive(Debug, Deserialize)]
pub struct EnquiryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// Incoming payload for a one-time passcode request.
#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    #[serde(default)]
    pub email: String,
}

/// Generic confirmation response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health probe response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
