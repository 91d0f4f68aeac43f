use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use postroom_domain::{ClientIdentity, Enquiry};

use crate::dto::{EnquiryRequest, MessageResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/enquiry - Submit a web-form enquiry.
pub async fn submit_enquiry_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<EnquiryRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let identity = derive_identity(&headers, remote)?;

    let enquiry = Enquiry::new(
        payload.name,
        payload.email,
        payload.phone,
        payload.address,
        payload.kind,
        payload.message,
    )?;

    state.enquiry_service.submit(&enquiry, &identity).await?;

    Ok(Json(MessageResponse {
        message: "enquiry sent".to_owned(),
    }))
}

fn derive_identity(headers: &HeaderMap, remote: SocketAddr) -> ApiResult<ClientIdentity> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok());

    ClientIdentity::derive(forwarded, &remote.ip().to_string()).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::{HeaderMap, HeaderValue};
    use postroom_domain::ClientIdentity;

    use super::derive_identity;

    fn remote() -> SocketAddr {
        SocketAddr::from(([203, 0, 113, 7], 49152))
    }

    #[test]
    fn forwarded_header_wins_over_socket_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.1, 172.16.0.9, 192.168.1.5"),
        );

        let identity = derive_identity(&headers, remote());
        assert_eq!(
            identity.as_ref().map(ClientIdentity::as_str).ok(),
            Some("10.0.0.1 192.168.1.5")
        );
    }

    #[test]
    fn missing_header_falls_back_to_socket_ip() {
        let identity = derive_identity(&HeaderMap::new(), remote());
        assert_eq!(
            identity.as_ref().map(ClientIdentity::as_str).ok(),
            Some("203.0.113.7")
        );
    }
}
