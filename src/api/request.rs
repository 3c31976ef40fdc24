//! API request helpers

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use axum::extract::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::rejection::JsonRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::rejection::QueryRejection;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use url::Url;

use crate::tokens::is_well_formed;

use super::Error;

/// Parse and validate a URL to shorten
///
/// Only absolute HTTP(S) URLs with a host are accepted
///
/// ```rust
/// let url = "https://www.example.com/";
/// assert!(parse_url(url).is_ok())
/// ```
pub fn parse_url<I>(url: I) -> Result<Url, Error>
where
    I: AsRef<str>,
{
    let url =
        Url::parse(url.as_ref().trim()).map_err(|_| Error::bad_request("Invalid URL format"))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none_or(str::is_empty) {
        return Err(Error::bad_request("Invalid URL format"));
    }

    Ok(url)
}

/// Get the short token out of a short URL, or a bare token
///
/// ```rust
/// assert_eq!(extract_token("https://sni.pr/abc123"), Some("abc123".to_string()))
/// ```
pub fn extract_token(short_url: &str) -> Option<String> {
    let short_url = short_url.trim();

    let path = match Url::parse(short_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => short_url.to_string(),
    };

    path.trim_matches('/')
        .rsplit('/')
        .next()
        .filter(|token| is_well_formed(token))
        .map(ToString::to_string)
}

pub(super) fn parse_json<J>(json: Result<Json<J>, JsonRejection>) -> Result<J, Error> {
    match json {
        Ok(Json(json)) => Ok(json),
        Err(err) => match err {
            JsonRejection::JsonDataError(err) => {
                Err(Error::bad_request("Data error").with_description(err))
            }
            JsonRejection::JsonSyntaxError(err) => {
                let description = std::error::Error::source(&err)
                    .map_or_else(|| err.body_text(), ToString::to_string);

                Err(Error::bad_request("JSON syntax error").with_description(description))
            }
            JsonRejection::MissingJsonContentType(_err) => Err(Error::bad_request(
                "Missing `application/json` content type",
            )),
            JsonRejection::BytesRejection(err) => {
                Err(Error::bad_request("Invalid characters in JSON").with_description(err))
            }
            err => Err(Error::bad_request("Unknown JSON error").with_description(err)),
        },
    }
}

/// Wrapper for the JSON extractor
pub struct Form<F>(pub F);

impl<S, F> FromRequest<S> for Form<F>
where
    S: Send + Sync,
    F: DeserializeOwned,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json = Json::<F>::from_request(req, state).await;

        parse_json(json).map(Form)
    }
}

fn parse_path<P>(path: Result<Path<P>, PathRejection>) -> Result<P, Error> {
    match path {
        Ok(Path(path)) => Ok(path),
        Err(err) => match err {
            PathRejection::FailedToDeserializePathParams(err) => {
                Err(Error::bad_request("Invalid path parameter").with_description(err))
            }
            PathRejection::MissingPathParams(err) => {
                Err(Error::bad_request("Missing path parameter").with_description(err))
            }
            err => Err(Error::bad_request("Unknown path error").with_description(err)),
        },
    }
}

pub struct PathParameters<P>(pub P);

impl<S, P> FromRequestParts<S> for PathParameters<P>
where
    S: Send + Sync,
    P: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let path = Path::<P>::from_request_parts(parts, state).await;

        parse_path(path).map(PathParameters)
    }
}

fn parse_query<Q>(query: Result<Query<Q>, QueryRejection>) -> Result<Q, Error> {
    match query {
        Ok(Query(query)) => Ok(query),
        Err(QueryRejection::FailedToDeserializeQueryString(err)) => {
            Err(Error::bad_request("Invalid query parameter").with_description(err.body_text()))
        }
        Err(err) => Err(Error::bad_request("Unknown query error").with_description(err)),
    }
}

pub struct QueryParameters<Q>(pub Q);

impl<S, Q> FromRequestParts<S> for QueryParameters<Q>
where
    S: Send + Sync,
    Q: DeserializeOwned,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<Q>::from_request_parts(parts, state).await;

        parse_query(query).map(QueryParameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        assert!(parse_url("https://www.example.com/").is_ok());
        assert!(parse_url("http://example.com/a?b=c#d").is_ok());

        assert!(parse_url("example.com").is_err());
        assert!(parse_url("ftp://example.com/file").is_err());
        assert!(parse_url("javascript:alert(1)").is_err());
        assert!(parse_url("").is_err());
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(
            Some("abc123".to_string()),
            extract_token("https://sni.pr/abc123")
        );
        assert_eq!(
            Some("abc123".to_string()),
            extract_token("http://localhost:4000/abc123/")
        );
        assert_eq!(Some("abc123".to_string()), extract_token("abc123"));
        assert_eq!(Some("abc123".to_string()), extract_token("/abc123"));

        assert_eq!(None, extract_token("https://sni.pr/"));
        assert_eq!(None, extract_token("https://sni.pr/not-a-token"));
        assert_eq!(None, extract_token(""));
    }
}
