//! Admin API endpoints
//!
//! Login, and management of links and reports

use axum::Extension;
use axum::body::Bytes;
use axum::extract::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::links::Link;
use crate::password::verify;
use crate::reports::Report;
use crate::storage::Pagination;
use crate::storage::Storage;
use crate::views::ViewEvent;

use super::CurrentAdmin;
use super::Error;
use super::Form;
use super::JwtKeys;
use super::PathParameters;
use super::QueryParameters;
use super::StoreTimeout;
use super::Success;
use super::current_admin::Token;
use super::current_admin::generate_token;
use super::extract_token;
use super::request::parse_json;
use super::response::Message;

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: u32 = 100;
const RECENT_VIEWS: u64 = 50;

/// Login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Username of the admin
    user: Option<String>,

    /// Password of the admin
    passphrase: Option<String>,
}

/// Get a token for an admin "session"
///
/// The token can then be used to access the rest of the admin routes by using it in the
/// `Authorization` header
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "user": "admin", "passphrase": "verysecret" }' \
///     http://localhost:4000/admin/login
/// ```
///
/// Response
/// ```json
/// { "access_token": "some token", "token_type": "Bearer", "expires_in": 28800 }
/// ```
pub async fn login<S: Storage>(
    Extension(jwt_keys): Extension<JwtKeys>,
    Extension(storage): Extension<S>,
    Extension(store_timeout): Extension<StoreTimeout>,
    Form(form): Form<LoginForm>,
) -> Result<Success<Token>, Error> {
    let (Some(username), Some(password)) = (form.user, form.passphrase) else {
        return Err(Error::unauthorized("Unauthorized"));
    };

    let admin = store_timeout
        .bound(storage.find_admin_by_username(&username))
        .await?;

    match admin {
        Some(admin) if verify(&admin.hashed_password, &password) => {
            tracing::info!("Admin `{username}` logged in");

            Ok(Success::ok(generate_token(&jwt_keys, &admin)?))
        }
        _ => {
            tracing::info!("Failed login attempt for `{username}`");

            Err(Error::unauthorized("Unauthorized"))
        }
    }
}

/// Page query
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<i64>,
    per_page: Option<i64>,
}

impl PageQuery {
    /// Validate the requested page, `per_page` is capped
    fn pagination(&self) -> Result<Pagination, Error> {
        let page = self.page.unwrap_or(1);
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);

        if page < 1 {
            return Err(Error::bad_request("Invalid page"));
        }

        if per_page < 1 {
            return Err(Error::bad_request("Invalid per_page"));
        }

        Ok(Pagination {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            per_page: u32::try_from(per_page).map_or(MAX_PER_PAGE, |per_page| {
                per_page.min(MAX_PER_PAGE)
            }),
        })
    }
}

/// One page of a listing
#[derive(Debug, Serialize)]
pub struct Page<T> {
    items: Vec<T>,
    page: u32,
    per_page: u32,
    total: u64,
    pages: u64,
}

impl<T> Page<T> {
    fn new(items: Vec<T>, pagination: Pagination, total: u64) -> Self {
        Self {
            items,
            page: pagination.page,
            per_page: pagination.per_page,
            total,
            pages: total.div_ceil(u64::from(pagination.per_page)),
        }
    }
}

/// Link response going to the admin
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    id: Uuid,
    short_token: String,
    original_url: String,
    created_at: DateTime<Utc>,
    submitter_ip: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    safe_view_count: i64,
    unsafe_view_count: i64,
}

impl From<Link> for LinkResponse {
    fn from(link: Link) -> Self {
        Self {
            id: link.id,
            short_token: link.short_token,
            original_url: link.original_url,
            created_at: link.created_at,
            submitter_ip: link.submitter_ip,
            expires_at: link.expires_at,
            safe_view_count: link.safe_view_count,
            unsafe_view_count: link.unsafe_view_count,
        }
    }
}

/// View response going to the admin
#[derive(Debug, Serialize)]
pub struct ViewResponse {
    client_ip: Option<String>,
    user_agent: Option<String>,
    is_safe: bool,
    created_at: DateTime<Utc>,
}

impl From<ViewEvent> for ViewResponse {
    fn from(view: ViewEvent) -> Self {
        Self {
            client_ip: view.client_ip,
            user_agent: view.user_agent,
            is_safe: view.is_safe,
            created_at: view.created_at,
        }
    }
}

/// A link with its latest views
#[derive(Debug, Serialize)]
pub struct LinkDetailsResponse {
    #[serde(flatten)]
    link: LinkResponse,

    recent_views: Vec<ViewResponse>,
}

/// Report response going to the admin
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    id: Uuid,
    original_url: String,
    created_at: DateTime<Utc>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            id: report.id,
            original_url: report.original_url,
            created_at: report.created_at,
        }
    }
}

/// List links, newest first
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     'http://localhost:4000/admin/links?page=1&per_page=20'
/// ```
pub async fn list_links<S: Storage>(
    _current_admin: CurrentAdmin<S>,
    Extension(storage): Extension<S>,
    Extension(store_timeout): Extension<StoreTimeout>,
    QueryParameters(query): QueryParameters<PageQuery>,
) -> Result<Success<Page<LinkResponse>>, Error> {
    let pagination = query.pagination()?;

    let links = store_timeout.bound(storage.find_links(&pagination)).await?;
    let total = store_timeout.bound(storage.count_links()).await?;

    let items = links.into_iter().map(LinkResponse::from).collect();

    Ok(Success::ok(Page::new(items, pagination, total)))
}

/// Delete links query
#[derive(Debug, Deserialize)]
pub struct DeleteLinksQuery {
    /// Delete all links when `true`
    bulk: Option<String>,
}

/// Delete link form
#[derive(Debug, Deserialize)]
pub struct DeleteLinkForm {
    /// Short URL or bare token of the link
    short_url: Option<String>,
}

/// Delete a single link, or all of them with `?bulk=true`
///
/// Views of deleted links are deleted as well
///
/// Request:
/// ```sh
/// curl -v -X DELETE -H 'Authorization: Bearer tokentokentoken' \
///     -H 'Content-Type: application/json' \
///     -d '{ "short_url": "abc123" }' \
///     http://localhost:4000/admin/links
/// ```
pub async fn delete_links<S: Storage>(
    current_admin: CurrentAdmin<S>,
    Extension(storage): Extension<S>,
    Extension(store_timeout): Extension<StoreTimeout>,
    QueryParameters(query): QueryParameters<DeleteLinksQuery>,
    body: Bytes,
) -> Result<Success<Message>, Error> {
    let bulk = query
        .bulk
        .is_some_and(|bulk| bulk.eq_ignore_ascii_case("true"));

    if bulk {
        let deleted = store_timeout.bound(storage.delete_all_links()).await?;

        tracing::info!("Admin `{}` deleted all {deleted} links", current_admin.username);

        return Ok(Success::message("All URLs deleted successfully"));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::bad_request("Missing short URL"));
    }

    let form = parse_json(Json::<DeleteLinkForm>::from_bytes(&body))?;

    let short_url = form
        .short_url
        .filter(|short_url| !short_url.trim().is_empty())
        .ok_or_else(|| Error::bad_request("Missing short URL"))?;

    let short_token =
        extract_token(&short_url).ok_or_else(|| Error::not_found("URL not found"))?;

    if store_timeout.bound(storage.delete_link(&short_token)).await? {
        tracing::info!(
            "Admin `{}` deleted link `{short_token}`",
            current_admin.username
        );

        Ok(Success::message("URL deleted successfully"))
    } else {
        Err(Error::not_found("URL not found"))
    }
}

/// Get a single link with its counters and latest views
///
/// Expired links are included
pub async fn link_details<S: Storage>(
    _current_admin: CurrentAdmin<S>,
    Extension(storage): Extension<S>,
    Extension(store_timeout): Extension<StoreTimeout>,
    PathParameters(short_token): PathParameters<String>,
) -> Result<Success<LinkDetailsResponse>, Error> {
    let link = store_timeout
        .bound(storage.find_link_by_token(&short_token))
        .await?
        .ok_or_else(|| Error::not_found("URL not found"))?;

    let views = store_timeout
        .bound(storage.find_recent_views(&short_token, RECENT_VIEWS))
        .await?;

    Ok(Success::ok(LinkDetailsResponse {
        link: LinkResponse::from(link),
        recent_views: views.into_iter().map(ViewResponse::from).collect(),
    }))
}

/// List reports, newest first
pub async fn list_reports<S: Storage>(
    _current_admin: CurrentAdmin<S>,
    Extension(storage): Extension<S>,
    Extension(store_timeout): Extension<StoreTimeout>,
    QueryParameters(query): QueryParameters<PageQuery>,
) -> Result<Success<Page<ReportResponse>>, Error> {
    let pagination = query.pagination()?;

    let reports = store_timeout.bound(storage.find_reports(&pagination)).await?;
    let total = store_timeout.bound(storage.count_reports()).await?;

    let items = reports.into_iter().map(ReportResponse::from).collect();

    Ok(Success::ok(Page::new(items, pagination, total)))
}

/// Report to delete, by query or body
#[derive(Debug, Deserialize)]
pub struct ReportIdForm {
    report_id: Option<String>,
}

/// Delete a single report
///
/// The ID is taken from the `report_id` query parameter, or from a JSON body
pub async fn delete_report<S: Storage>(
    current_admin: CurrentAdmin<S>,
    Extension(storage): Extension<S>,
    Extension(store_timeout): Extension<StoreTimeout>,
    QueryParameters(query): QueryParameters<ReportIdForm>,
    body: Bytes,
) -> Result<Success<Message>, Error> {
    let report_id = match query.report_id {
        Some(report_id) => Some(report_id),
        None if body.iter().all(u8::is_ascii_whitespace) => None,
        None => parse_json(Json::<ReportIdForm>::from_bytes(&body))?.report_id,
    };

    let report_id = report_id
        .filter(|report_id| !report_id.trim().is_empty())
        .ok_or_else(|| Error::bad_request("Missing report ID"))?;

    let report_id = Uuid::parse_str(report_id.trim())
        .map_err(|err| Error::bad_request("Invalid report ID").with_description(err))?;

    if store_timeout.bound(storage.delete_report(&report_id)).await? {
        tracing::info!(
            "Admin `{}` deleted report `{report_id}`",
            current_admin.username
        );

        Ok(Success::message("Report deleted successfully"))
    } else {
        Err(Error::not_found("Report not found"))
    }
}

/// Delete all reports
pub async fn delete_all_reports<S: Storage>(
    current_admin: CurrentAdmin<S>,
    Extension(storage): Extension<S>,
    Extension(store_timeout): Extension<StoreTimeout>,
) -> Result<Success<Message>, Error> {
    let deleted = store_timeout.bound(storage.delete_all_reports()).await?;

    tracing::info!(
        "Admin `{}` deleted all {deleted} reports",
        current_admin.username
    );

    Ok(Success::message("All reports deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query() {
        let query = PageQuery {
            page: None,
            per_page: None,
        };
        assert_eq!(
            Pagination {
                page: 1,
                per_page: 20
            },
            query.pagination().unwrap()
        );

        let query = PageQuery {
            page: Some(3),
            per_page: Some(5000),
        };
        assert_eq!(
            Pagination {
                page: 3,
                per_page: 100
            },
            query.pagination().unwrap()
        );

        let query = PageQuery {
            page: Some(0),
            per_page: None,
        };
        assert!(query.pagination().is_err());

        let query = PageQuery {
            page: None,
            per_page: Some(-1),
        };
        assert!(query.pagination().is_err());
    }

    #[test]
    fn test_page_count() {
        let pagination = Pagination {
            page: 1,
            per_page: 20,
        };

        assert_eq!(0, Page::<()>::new(vec![], pagination, 0).pages);
        assert_eq!(1, Page::<()>::new(vec![], pagination, 20).pages);
        assert_eq!(2, Page::<()>::new(vec![], pagination, 21).pages);
    }
}
