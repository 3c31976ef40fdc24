//! The root!
//!
//! The most important part of Snipr, the actual redirect logic

use axum::Extension;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::http::header::USER_AGENT;
use url::Url;

use crate::analytics::Analytics;
use crate::api::Error;
use crate::api::PathParameters;
use crate::client_ip::ClientIp;
use crate::shortener::Shortener;
use crate::storage::Storage;

/// The root!
///
/// A lookup in storage will be done looking for the live link behind the token. Unknown and
/// expired tokens look the same from the outside.
///
/// The view is recorded in the background, the redirect does not wait for it
pub async fn root<S: Storage>(
    Extension(shortener): Extension<Shortener<S>>,
    Extension(analytics): Extension<Analytics<S>>,
    client_ip: Option<ClientIp>,
    headers: HeaderMap,
    PathParameters(short_token): PathParameters<String>,
) -> Result<(StatusCode, HeaderMap), Error> {
    tracing::debug!("Looking for short token: /{short_token}");

    let Some(link) = shortener.resolve(&short_token).await? else {
        tracing::debug!(r#"Short token "{short_token}" not found"#);

        return Err(not_found());
    };

    let location = location(&link.original_url)?;

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|user_agent| user_agent.to_str().ok())
        .map(ToString::to_string);

    analytics.record_view(
        &link,
        client_ip.map(|client_ip| client_ip.ip_address),
        user_agent,
    );

    tracing::debug!(
        r#"Short token "{short_token}" redirecting to: {}"#,
        link.original_url
    );

    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, location);

    Ok((StatusCode::FOUND, headers))
}

/// The stored URL as is, or its serialized form when that is not a valid header value
fn location(original_url: &str) -> Result<HeaderValue, Error> {
    if let Ok(location) = HeaderValue::from_str(original_url) {
        return Ok(location);
    }

    let url = Url::parse(original_url).map_err(Error::internal_server_error)?;

    HeaderValue::from_str(url.as_str()).map_err(Error::internal_server_error)
}

/// Everything that is not a short token or an API route
pub async fn fallback() -> Error {
    not_found()
}

fn not_found() -> Error {
    Error::not_found("URL not found")
}
