//! Public API endpoints
//!
//! Shortening and reporting, both guarded by a captcha

use std::sync::Arc;

use axum::Extension;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::analytics::Analytics;
use crate::captcha::CaptchaVerifier;
use crate::client_ip::ClientIp;
use crate::shortener::ShortenError;
use crate::shortener::Shortener;
use crate::storage::Storage;

use super::Error;
use super::Form;
use super::QueryParameters;
use super::Success;
use super::extract_token;
use super::parse_url;
use super::response::Message;

impl From<ShortenError> for Error {
    fn from(err: ShortenError) -> Self {
        match err {
            ShortenError::InvalidExpiry(_) => Error::bad_request(err),
            ShortenError::StoreUnavailable => Error::internal_server_error(err),
        }
    }
}

/// Shorten form
#[derive(Debug, Deserialize)]
pub struct ShortenForm {
    /// URL to shorten
    url: Option<String>,

    /// Expiry selector, the link never expires without one
    expiry: Option<String>,

    /// reCAPTCHA token
    captcha: Option<String>,
}

/// Newly shortened URL
#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    /// The short token
    short_url: String,

    /// Moment the link stops resolving
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// Shorten a URL
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "url": "https://example.com/a", "expiry": "Nmg=", "captcha": "..." }' \
///     http://localhost:4000/shorten
/// ```
///
/// Response:
/// ```json
/// { "short_url": "abc123", "expires_at": "2024-10-19T16:00:00Z" }
/// ```
pub async fn shorten<S: Storage>(
    Extension(shortener): Extension<Shortener<S>>,
    Extension(captcha): Extension<Arc<dyn CaptchaVerifier>>,
    client_ip: Option<ClientIp>,
    Form(form): Form<ShortenForm>,
) -> Result<Success<ShortenResponse>, Error> {
    let client_ip = client_ip.map(|client_ip| client_ip.ip_address);

    let (Some(url), Some(captcha_token)) = (form.url, form.captcha) else {
        return Err(Error::bad_request("Missing url, captcha or invalid expiry"));
    };

    if url.is_empty() || !captcha.verify(&captcha_token, client_ip).await {
        return Err(Error::bad_request("Missing url, captcha or invalid expiry"));
    }

    // validated, but stored the way it was sent
    let url = url.trim();
    parse_url(url)?;

    let link = shortener
        .allocate(url, client_ip, form.expiry.as_deref())
        .await?;

    Ok(Success::created(ShortenResponse {
        short_url: link.short_token,
        expires_at: link.expires_at,
    }))
}

/// Report query
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// Short URL or bare token of the reported link
    url: Option<String>,

    /// reCAPTCHA token
    token: Option<String>,
}

/// Report a short URL for abuse
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:4000/report?url=http://localhost:4000/abc123&token=...'
/// ```
pub async fn report<S: Storage>(
    Extension(shortener): Extension<Shortener<S>>,
    Extension(analytics): Extension<Analytics<S>>,
    Extension(captcha): Extension<Arc<dyn CaptchaVerifier>>,
    client_ip: Option<ClientIp>,
    QueryParameters(query): QueryParameters<ReportQuery>,
) -> Result<Success<Message>, Error> {
    let client_ip = client_ip.map(|client_ip| client_ip.ip_address);

    let (Some(url), Some(captcha_token)) = (query.url, query.token) else {
        return Err(Error::bad_request("Missing url or token"));
    };

    if url.is_empty() || !captcha.verify(&captcha_token, client_ip).await {
        return Err(Error::bad_request("Missing url or token"));
    }

    let short_token =
        extract_token(&url).ok_or_else(|| Error::bad_request("Invalid URL format"))?;

    let link = shortener
        .resolve(&short_token)
        .await?
        .ok_or_else(|| Error::not_found("URL not found"))?;

    analytics
        .report(&link)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::message("Your report was successfully sent"))
}
