//! Expiry selectors
//!
//! Clients never send a point in time, they pick one of a fixed set of opaque selectors which
//! map to a duration. The set itself is configuration.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use thiserror::Error;

/// Selectors used when `EXPIRY_OPTIONS` is not set
///
/// The selectors are the base64 encoded labels: `6h`, `24h`, `3d` and `1w`
pub const DEFAULT_EXPIRY_OPTIONS: &str = "Nmg=:6h,MjRo:24h,M2Q=:3d,MXc=:7d";

/// Longest duration a selector may map to
const MAX_DURATION: Duration = Duration::days(100 * 365);

/// Problems parsing an expiry configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// An entry is not in the `selector:duration` form
    #[error("expected `selector:duration`, got {0:?}")]
    MalformedEntry(String),

    /// A duration could not be parsed
    #[error("invalid duration {0:?}, expected a positive number followed by s, m, h, d or w")]
    InvalidDuration(String),

    /// The same selector is listed twice
    #[error("selector {0:?} is listed more than once")]
    DuplicateSelector(String),
}

/// The selector is not part of the configured set
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid expiry value: {0:?}")]
pub struct InvalidExpiry(pub String);

/// The allowed expiry selectors and their durations
#[derive(Clone, Debug)]
pub struct ExpiryOptions {
    /// Selector to duration
    durations: HashMap<String, Duration>,
}

impl ExpiryOptions {
    /// Resolve a selector into an expiration moment, relative to `now`
    ///
    /// No selector (or an empty one) means the link never expires
    pub fn resolve(
        &self,
        selector: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, InvalidExpiry> {
        let Some(selector) = selector.filter(|selector| !selector.is_empty()) else {
            return Ok(None);
        };

        self.durations
            .get(selector)
            .and_then(|duration| now.checked_add_signed(*duration))
            .map(Some)
            .ok_or_else(|| InvalidExpiry(selector.to_string()))
    }

    /// Number of configured selectors
    pub fn len(&self) -> usize {
        self.durations.len()
    }
}

impl Default for ExpiryOptions {
    fn default() -> Self {
        DEFAULT_EXPIRY_OPTIONS
            .parse()
            .unwrap_or_else(|_| Self {
                durations: HashMap::new(),
            })
    }
}

impl FromStr for ExpiryOptions {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut durations = HashMap::new();

        for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            // selectors are base64, so they may contain `=` but never `:`
            let (selector, duration) = entry
                .rsplit_once(':')
                .ok_or_else(|| ParseError::MalformedEntry(entry.to_string()))?;

            let selector = selector.trim();
            if selector.is_empty() {
                return Err(ParseError::MalformedEntry(entry.to_string()));
            }

            let duration = parse_duration(duration.trim())?;

            if durations.insert(selector.to_string(), duration).is_some() {
                return Err(ParseError::DuplicateSelector(selector.to_string()));
            }
        }

        Ok(Self { durations })
    }
}

/// Parse a duration like `30m`, `6h` or `3d`
pub fn parse_duration(value: &str) -> Result<Duration, ParseError> {
    let invalid = || ParseError::InvalidDuration(value.to_string());

    let split_at = value
        .find(|ch: char| !ch.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (amount, unit) = value.split_at(split_at);

    let amount = amount.parse::<i64>().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    let duration = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => Duration::try_weeks(amount),
        _ => None,
    };

    duration
        .filter(|duration| *duration <= MAX_DURATION)
        .ok_or_else(invalid)
}
