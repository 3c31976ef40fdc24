//! Views
//!
//! One event per followed redirect

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

/// Markers of automated user agents
const AUTOMATED_USER_AGENT_MARKERS: &[&str] = &[
    "bot",
    "crawl",
    "spider",
    "slurp",
    "preview",
    "curl",
    "wget",
    "python-requests",
    "headless",
];

/// A recorded view of a link
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ViewEvent {
    /// View ID
    pub id: Uuid,

    /// Token of the viewed link
    pub short_token: String,

    /// IP address of the visitor, if known
    pub client_ip: Option<String>,

    /// User agent of the visitor, if sent
    pub user_agent: Option<String>,

    /// Whether the view counts as a regular visitor
    pub is_safe: bool,

    /// Moment of the view
    pub created_at: DateTime<Utc>,
}

/// How a view is counted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewKind {
    /// Looks like a regular visitor
    Safe,

    /// Looks automated, or gave us nothing to go on
    Unsafe,
}

impl ViewKind {
    /// Classify a view by its user agent
    pub fn classify(user_agent: Option<&str>) -> Self {
        let Some(user_agent) = user_agent.map(str::trim).filter(|ua| !ua.is_empty()) else {
            return Self::Unsafe;
        };

        let user_agent = user_agent.to_ascii_lowercase();

        if AUTOMATED_USER_AGENT_MARKERS
            .iter()
            .any(|marker| user_agent.contains(marker))
        {
            Self::Unsafe
        } else {
            Self::Safe
        }
    }

    pub fn is_safe(self) -> bool {
        self == Self::Safe
    }
}
