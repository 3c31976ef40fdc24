//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::cmp::Reverse;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::admins::Admin;
use crate::links::Link;
use crate::reports::Report;
use crate::views::ViewEvent;
use crate::views::ViewKind;

use super::CreateAdminValues;
use super::CreateLinkValues;
use super::CreateReportValues;
use super::Error;
use super::Pagination;
use super::RecordViewValues;
use super::Result;
use super::Storage;

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// All admins in storage
    admins: Arc<Mutex<HashMap<Uuid, Admin>>>,

    /// All links in storage, by short token
    links: Arc<Mutex<HashMap<String, Link>>>,

    /// All views in storage
    views: Arc<Mutex<Vec<ViewEvent>>>,

    /// All reports in storage
    reports: Arc<Mutex<HashMap<Uuid, Report>>>,
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

/// Take a single page out of all items, newest first
fn paginate<T, F>(mut items: Vec<T>, pagination: &Pagination, key: F) -> Vec<T>
where
    F: Fn(&T) -> (DateTime<Utc>, Uuid),
{
    items.sort_by_key(|item| {
        let (created_at, id) = key(item);
        (Reverse(created_at), id)
    });

    items
        .into_iter()
        .skip(usize::try_from(pagination.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(pagination.limit()).unwrap_or(usize::MAX))
        .collect()
}

#[async_trait]
impl Storage for Memory {
    async fn find_any_admin(&self) -> Result<Option<Admin>> {
        Ok(self.admins.lock().await.values().next().cloned())
    }

    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        Ok(self
            .admins
            .lock()
            .await
            .values()
            .find(|admin| admin.username == username)
            .cloned())
    }

    async fn create_admin(&self, values: &CreateAdminValues) -> Result<Admin> {
        let mut admins = self.admins.lock().await;

        if admins
            .values()
            .any(|admin| admin.username == values.username)
        {
            return Err(Error::Conflict(format!(
                "admin `{}` already exists",
                values.username
            )));
        }

        let admin = Admin {
            id: Uuid::new_v4(),
            username: values.username.to_string(),
            hashed_password: values.hashed_password.to_string(),
            created_at: Utc::now(),
        };

        admins.insert(admin.id, admin.clone());

        Ok(admin)
    }

    async fn create_link(&self, values: &CreateLinkValues) -> Result<Link> {
        match self
            .links
            .lock()
            .await
            .entry(values.short_token.to_string())
        {
            Entry::Occupied(_) => Err(Error::Conflict(format!(
                "short token `{}` already exists",
                values.short_token
            ))),
            Entry::Vacant(entry) => {
                let link = Link {
                    id: Uuid::new_v4(),
                    short_token: values.short_token.to_string(),
                    original_url: values.original_url.to_string(),
                    created_at: values.created_at,
                    submitter_ip: values.submitter_ip.map(ToString::to_string),
                    expires_at: values.expires_at,
                    safe_view_count: 0,
                    unsafe_view_count: 0,
                };

                Ok(entry.insert(link).clone())
            }
        }
    }

    async fn find_live_link_by_token(
        &self,
        short_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Link>> {
        Ok(self
            .links
            .lock()
            .await
            .get(short_token)
            .filter(|link| link.is_live_at(now))
            .cloned())
    }

    async fn find_link_by_token(&self, short_token: &str) -> Result<Option<Link>> {
        Ok(self.links.lock().await.get(short_token).cloned())
    }

    async fn find_links(&self, pagination: &Pagination) -> Result<Vec<Link>> {
        let links = self.links.lock().await.values().cloned().collect();

        Ok(paginate(links, pagination, |link| (link.created_at, link.id)))
    }

    async fn count_links(&self) -> Result<u64> {
        Ok(self.links.lock().await.len() as u64)
    }

    async fn delete_link(&self, short_token: &str) -> Result<bool> {
        let deleted = self.links.lock().await.remove(short_token).is_some();

        if deleted {
            self.views
                .lock()
                .await
                .retain(|view| view.short_token != short_token);
        }

        Ok(deleted)
    }

    async fn delete_all_links(&self) -> Result<u64> {
        let deleted = self.links.lock().await.drain().count();

        self.views.lock().await.clear();

        Ok(deleted as u64)
    }

    async fn record_view(&self, values: &RecordViewValues) -> Result<()> {
        // hold the links while the view is added, like a transaction would
        let mut links = self.links.lock().await;

        // the link was deleted after it resolved, its views are gone as well
        let Some(link) = links.get_mut(values.short_token) else {
            return Ok(());
        };

        match values.kind {
            ViewKind::Safe => link.safe_view_count += 1,
            ViewKind::Unsafe => link.unsafe_view_count += 1,
        }

        self.views.lock().await.push(ViewEvent {
            id: Uuid::new_v4(),
            short_token: values.short_token.to_string(),
            client_ip: values.client_ip.map(ToString::to_string),
            user_agent: values.user_agent.map(ToString::to_string),
            is_safe: values.kind.is_safe(),
            created_at: values.created_at,
        });

        Ok(())
    }

    async fn find_recent_views(&self, short_token: &str, limit: u64) -> Result<Vec<ViewEvent>> {
        let views = self
            .views
            .lock()
            .await
            .iter()
            .filter(|view| view.short_token == short_token)
            .cloned()
            .collect();

        let pagination = Pagination {
            page: 1,
            per_page: u32::try_from(limit).unwrap_or(u32::MAX),
        };

        Ok(paginate(views, &pagination, |view| (view.created_at, view.id)))
    }

    async fn create_report(&self, values: &CreateReportValues) -> Result<Report> {
        let report = Report {
            id: Uuid::new_v4(),
            original_url: values.original_url.to_string(),
            created_at: values.created_at,
        };

        self.reports.lock().await.insert(report.id, report.clone());

        Ok(report)
    }

    async fn find_reports(&self, pagination: &Pagination) -> Result<Vec<Report>> {
        let reports = self.reports.lock().await.values().cloned().collect();

        Ok(paginate(reports, pagination, |report| {
            (report.created_at, report.id)
        }))
    }

    async fn count_reports(&self) -> Result<u64> {
        Ok(self.reports.lock().await.len() as u64)
    }

    async fn delete_report(&self, id: &Uuid) -> Result<bool> {
        Ok(self.reports.lock().await.remove(id).is_some())
    }

    async fn delete_all_reports(&self) -> Result<u64> {
        Ok(self.reports.lock().await.drain().count() as u64)
    }
}
