//! Per client rate limiting
//!
//! Fixed windows per client IP address, counted in a `moka` cache whose entries expire together
//! with their window.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::Request;
use axum::extract::State;
use axum::middleware::Next;
use axum::response::Response;
use moka::future::Cache;
use thiserror::Error;

use crate::api::Error;
use crate::client_ip::ClientIp;

/// Upper bound of distinct clients tracked per limiter
const MAX_TRACKED_CLIENTS: u64 = 100_000;

/// Bucket for clients without a known IP address
const UNKNOWN_CLIENT: &str = "unknown";

/// A limit like `50 per minute`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimit {
    /// Allowed requests per window
    pub requests: u32,

    /// Length of the window
    pub window: Duration,
}

/// The limit could not be parsed
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid rate limit {0:?}, expected something like `50 per minute`")]
pub struct ParseRateLimitError(String);

impl FromStr for RateLimit {
    type Err = ParseRateLimitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseRateLimitError(value.to_string());

        let mut parts = value.split_whitespace();

        let requests = parts
            .next()
            .and_then(|requests| requests.parse::<u32>().ok())
            .filter(|requests| *requests > 0)
            .ok_or_else(invalid)?;

        let window = match (parts.next(), parts.next(), parts.next()) {
            (Some("per" | "/"), Some(unit), None) => window_from_unit(unit).ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };

        Ok(Self { requests, window })
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} per {}s", self.requests, self.window.as_secs())
    }
}

/// Window length for a named unit
fn window_from_unit(unit: &str) -> Option<Duration> {
    let seconds = match unit.trim_end_matches('s') {
        "second" => 1,
        "minute" => 60,
        "hour" => 60 * 60,
        "day" => 60 * 60 * 24,
        _ => return None,
    };

    Some(Duration::from_secs(seconds))
}

/// Counts requests per client within the current window
#[derive(Clone)]
pub struct RateLimiter {
    /// Name used in the logs
    name: &'static str,

    /// The enforced limit
    limit: RateLimit,

    /// Request counters per client, dropped when their window ends
    counters: Cache<String, Arc<AtomicU32>>,
}

impl RateLimiter {
    /// Create a limiter for the given limit
    pub fn new(name: &'static str, limit: RateLimit) -> Self {
        let counters = Cache::builder()
            .max_capacity(MAX_TRACKED_CLIENTS)
            .time_to_live(limit.window)
            .build();

        Self {
            name,
            limit,
            counters,
        }
    }

    /// Count a request of the client, `false` when it is over the limit
    pub async fn allow(&self, client: &str) -> bool {
        let counter = self
            .counters
            .get_with(client.to_string(), async { Arc::new(AtomicU32::new(0)) })
            .await;

        counter.fetch_add(1, Ordering::Relaxed) < self.limit.requests
    }
}

/// Middleware rejecting clients that went over the limit
pub async fn enforce(
    State(limiter): State<RateLimiter>,
    client_ip: Option<ClientIp>,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    let client = client_ip.map_or_else(
        || UNKNOWN_CLIENT.to_string(),
        |client_ip| client_ip.ip_address.to_string(),
    );

    if limiter.allow(&client).await {
        Ok(next.run(request).await)
    } else {
        tracing::info!(
            "Rate limit `{}` ({}) exceeded by {client}",
            limiter.name,
            limiter.limit
        );

        Err(Error::too_many_requests("Too many requests"))
    }
}
