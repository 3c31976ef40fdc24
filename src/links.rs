//! Links
//!
//! The mapping of a short token to the URL it redirects to

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

/// A short token and the URL behind it
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Link {
    /// Link ID
    pub id: Uuid,

    /// Unique short token, used as path to redirect
    pub short_token: String,

    /// Where the short token redirects to
    pub original_url: String,

    /// Creation date
    pub created_at: DateTime<Utc>,

    /// IP address of whoever shortened the URL
    pub submitter_ip: Option<String>,

    /// Moment the link stops resolving, never when absent
    pub expires_at: Option<DateTime<Utc>>,

    /// Views by regular visitors
    pub safe_view_count: i64,

    /// Views that look automated
    pub unsafe_view_count: i64,
}

impl Link {
    /// Does the link still resolve at the given moment?
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}
