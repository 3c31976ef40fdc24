//! All API endpoint setup

use std::future::Future;
use std::time::Duration;

use axum::Router;
use axum::middleware;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;

use crate::config::RateLimitConfig;
use crate::rate_limit;
use crate::rate_limit::RateLimiter;
use crate::storage;
use crate::storage::Storage;
use crate::storage::bounded;

pub use current_admin::CurrentAdmin;
pub use current_admin::JwtKeys;
pub use request::Form;
pub use request::PathParameters;
pub use request::QueryParameters;
pub use request::extract_token;
pub use request::parse_url;
pub use response::Error;
pub use response::Success;

mod admin;
mod current_admin;
mod public;
mod request;
mod response;

/// Bound on store calls made from the API
#[derive(Clone, Copy, Debug)]
pub struct StoreTimeout(pub Duration);

impl StoreTimeout {
    /// Run a store call within the bound, any failure is an internal server error
    pub async fn bound<T, F>(self, future: F) -> Result<T, Error>
    where
        F: Future<Output = storage::Result<T>>,
    {
        bounded(self.0, future)
            .await
            .map_err(Error::internal_server_error)
    }
}

/// Get the Axum router for all API routes
pub fn router<S: Storage>(rate_limits: &RateLimitConfig) -> Router {
    let shorten_limiter = RateLimiter::new("shorten", rate_limits.shorten);
    let report_limiter = RateLimiter::new("report", rate_limits.report);

    let admin = Router::new()
        .route("/login", post(admin::login::<S>))
        .route(
            "/links",
            get(admin::list_links::<S>).delete(admin::delete_links::<S>),
        )
        .route("/link/{short_token}", get(admin::link_details::<S>))
        .route(
            "/reports",
            get(admin::list_reports::<S>).delete(admin::delete_report::<S>),
        )
        .route("/reports/bulk", delete(admin::delete_all_reports::<S>));

    Router::new()
        .route(
            "/shorten",
            post(public::shorten::<S>).layer(middleware::from_fn_with_state(
                shorten_limiter,
                rate_limit::enforce,
            )),
        )
        .route(
            "/report",
            get(public::report::<S>).layer(middleware::from_fn_with_state(
                report_limiter,
                rate_limit::enforce,
            )),
        )
        .nest("/admin", admin)
}
