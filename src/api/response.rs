//! API response helpers

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;

/// Hold data for a successful API interaction
pub struct Success<V>
where
    V: Serialize,
{
    status_code: StatusCode,
    data: V,
}

impl<V> Success<V>
where
    V: Serialize,
{
    pub fn ok(data: V) -> Self {
        Self {
            status_code: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: V) -> Self {
        Self {
            status_code: StatusCode::CREATED,
            data,
        }
    }
}

/// Plain confirmation for the client
#[derive(Debug, Serialize)]
pub struct Message {
    message: &'static str,
}

impl Success<Message> {
    /// A `200 OK` with just a message
    pub fn message(message: &'static str) -> Self {
        Self::ok(Message { message })
    }
}

impl<V> IntoResponse for Success<V>
where
    V: Serialize,
{
    fn into_response(self) -> Response {
        (self.status_code, Json(self.data)).into_response()
    }
}

/// Hold data for a failed API interaction
#[derive(Debug)]
pub struct Error {
    status_code: StatusCode,
    message: String,
    description: Option<String>,
}

impl Error {
    fn new<M>(status_code: StatusCode, message: M) -> Self
    where
        M: ToString,
    {
        Self {
            status_code,
            message: message.to_string(),
            description: None,
        }
    }

    pub fn bad_request<M>(message: M) -> Self
    where
        M: ToString,
    {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized<M>(message: M) -> Self
    where
        M: ToString,
    {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found<M>(message: M) -> Self
    where
        M: ToString,
    {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn too_many_requests<M>(message: M) -> Self
    where
        M: ToString,
    {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    /// Log the cause and answer with a generic message
    ///
    /// The cause never reaches the client
    pub fn internal_server_error<M>(cause: M) -> Self
    where
        M: ToString,
    {
        tracing::error!("Internal server error: {}", cause.to_string());

        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    #[must_use]
    pub fn with_description<M>(self, description: M) -> Self
    where
        M: ToString,
    {
        Self {
            description: Some(description.to_string()),
            ..self
        }
    }
}

/// What the client gets to see of an [`Error`]
#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            description: self.description.as_deref(),
        };

        (self.status_code, Json(body)).into_response()
    }
}
