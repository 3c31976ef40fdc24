//! All things related to the storage of links, views, reports and admins

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::admins::Admin;
use crate::links::Link;
use crate::reports::Report;
use crate::views::ViewEvent;
use crate::views::ViewKind;

pub use memory::Memory;
pub use postgres::Postgres;

mod memory;
mod postgres;

/// Storage errors
#[derive(Debug, Error)]
pub enum Error {
    /// A value that has to be unique already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The storage did not answer in time
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// A connection error with the storage
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Bound a storage call in time
///
/// A call that does not finish within `timeout` becomes [`Error::Timeout`]
pub async fn bounded<T, F>(timeout: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, future)
        .await
        .unwrap_or_else(|_| Err(Error::Timeout(timeout)))
}

/// One page of a listing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number
    pub page: u32,

    /// Items per page
    pub per_page: u32,
}

impl Pagination {
    /// Number of items before this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Maximum number of items on this page
    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

/// Values to create an Admin
pub struct CreateAdminValues<'a> {
    /// The username
    pub username: &'a str,

    /// The hashed password
    pub hashed_password: &'a str,
}

/// Values to create a Link
pub struct CreateLinkValues<'a> {
    /// Candidate short token, rejected with [`Error::Conflict`] when taken
    pub short_token: &'a str,

    /// URL to redirect to
    pub original_url: &'a str,

    /// IP address of the submitter
    pub submitter_ip: Option<&'a str>,

    /// Creation moment
    pub created_at: DateTime<Utc>,

    /// Expiration moment, if any
    pub expires_at: Option<DateTime<Utc>>,
}

/// Values to record a view
pub struct RecordViewValues<'a> {
    /// Token of the viewed link
    pub short_token: &'a str,

    /// IP address of the visitor
    pub client_ip: Option<&'a str>,

    /// User agent of the visitor
    pub user_agent: Option<&'a str>,

    /// Counter to increment
    pub kind: ViewKind,

    /// Moment of the view
    pub created_at: DateTime<Utc>,
}

/// Values to create a Report
pub struct CreateReportValues<'a> {
    /// The reported URL
    pub original_url: &'a str,

    /// Moment of the report
    pub created_at: DateTime<Utc>,
}

/// Storage with all supported operations
///
/// Listings are ordered newest first, ties broken by ID, so pages never overlap
#[async_trait]
pub trait Storage: Clone + Send + Sync + 'static {
    /// Find any single admin
    async fn find_any_admin(&self) -> Result<Option<Admin>>;

    /// Find a single admin by username
    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>>;

    /// Create an admin
    async fn create_admin(&self, values: &CreateAdminValues) -> Result<Admin>;

    /// Create a link
    ///
    /// Atomically fails with [`Error::Conflict`] when the short token is taken
    async fn create_link(&self, values: &CreateLinkValues) -> Result<Link>;

    /// Find a link by short token that has not expired at `now`
    async fn find_live_link_by_token(
        &self,
        short_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Link>>;

    /// Find a link by short token
    ///
    /// DOES NOT respect the expiry, handle with care
    async fn find_link_by_token(&self, short_token: &str) -> Result<Option<Link>>;

    /// Find one page of links
    async fn find_links(&self, pagination: &Pagination) -> Result<Vec<Link>>;

    /// Count all links
    async fn count_links(&self) -> Result<u64>;

    /// Delete a link and its views, `false` when there was no such link
    async fn delete_link(&self, short_token: &str) -> Result<bool>;

    /// Delete all links and all views, returns the number of deleted links
    async fn delete_all_links(&self) -> Result<u64>;

    /// Save a view event and bump the matching counter of the link
    async fn record_view(&self, values: &RecordViewValues) -> Result<()>;

    /// Find the most recent views of a link
    async fn find_recent_views(&self, short_token: &str, limit: u64) -> Result<Vec<ViewEvent>>;

    /// Create a report
    async fn create_report(&self, values: &CreateReportValues) -> Result<Report>;

    /// Find one page of reports
    async fn find_reports(&self, pagination: &Pagination) -> Result<Vec<Report>>;

    /// Count all reports
    async fn count_reports(&self) -> Result<u64>;

    /// Delete a report, `false` when there was no such report
    async fn delete_report(&self, id: &Uuid) -> Result<bool>;

    /// Delete all reports, returns the number of deleted reports
    async fn delete_all_reports(&self) -> Result<u64>;
}
