use axum::Json;
use axum::extract::State;

use crate::dto::{MessageResponse, OtpRequest};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/otp/send - Issue a passcode for a new account email.
pub async fn send_otp_handler(
    State(state): State<AppState>,
    Json(payload): Json<OtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .otp_service
        .issue_for_new_account(&payload.email)
        .await?;

    Ok(Json(MessageResponse {
        message: "verification code sent".to_owned(),
    }))
}

/// POST /api/otp/resend - Reissue a passcode for an existing account email.
pub async fn resend_otp_handler(
    State(state): State<AppState>,
    Json(payload): Json<OtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .otp_service
        .reissue_for_account(&payload.email)
        .await?;

    Ok(Json(MessageResponse {
        message: "verification code sent".to_owned(),
    }))
}
