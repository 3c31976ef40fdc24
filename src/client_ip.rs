//! Optional client IP address extractor
//!
//! Requests without a resolvable address (like in-process test requests) still get served, they
//! just have no IP to record or rate limit on.

use std::convert::Infallible;
use std::net::IpAddr;

use axum::extract::FromRequestParts as _;
use axum::extract::OptionalFromRequestParts;
use axum::http::request::Parts;

/// Client IP address extractor
#[derive(Debug, Clone, Copy)]
pub struct ClientIp {
    /// The client IP address
    pub ip_address: IpAddr,
}

impl<S> OptionalFromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let client_ip = axum_client_ip::ClientIp::from_request_parts(parts, state).await;

        Ok(client_ip
            .ok()
            .map(|axum_client_ip::ClientIp(ip_address)| Self { ip_address }))
    }
}
