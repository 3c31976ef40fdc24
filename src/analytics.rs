//! Views and abuse reports
//!
//! Views are recorded in the background: a redirect never waits for, nor fails on, its view.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;

use crate::clock::Clock;
use crate::links::Link;
use crate::reports::Report;
use crate::storage;
use crate::storage::CreateReportValues;
use crate::storage::RecordViewValues;
use crate::storage::Storage;
use crate::storage::bounded;
use crate::views::ViewKind;

/// Records views and reports of links
#[derive(Clone)]
pub struct Analytics<S: Storage> {
    /// Where views and reports are kept
    storage: S,

    /// Source of `now`
    clock: Arc<dyn Clock>,

    /// Background recordings, drained on shutdown
    tasks: TaskTracker,

    /// Bound on every store call
    store_timeout: Duration,
}

impl<S: Storage> Analytics<S> {
    pub fn new(
        storage: S,
        clock: Arc<dyn Clock>,
        tasks: TaskTracker,
        store_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            clock,
            tasks,
            store_timeout,
        }
    }

    /// Record a view of the link without waiting for it
    pub fn record_view(&self, link: &Link, client_ip: Option<IpAddr>, user_agent: Option<String>) {
        let storage = self.storage.clone();
        let store_timeout = self.store_timeout;
        let short_token = link.short_token.clone();
        let created_at = self.clock.now();

        self.tasks.spawn(async move {
            let client_ip = client_ip.map(|ip_address| ip_address.to_string());
            let kind = ViewKind::classify(user_agent.as_deref());

            let values = RecordViewValues {
                short_token: &short_token,
                client_ip: client_ip.as_deref(),
                user_agent: user_agent.as_deref(),
                kind,
                created_at,
            };

            match bounded(store_timeout, storage.record_view(&values)).await {
                Ok(()) => tracing::debug!("Recorded {kind:?} view of `{short_token}`"),
                Err(err) => tracing::warn!("Could not record view of `{short_token}`: {err}"),
            }
        });
    }

    /// Store a report about the original URL of a link
    ///
    /// # Errors
    ///
    /// Will return `Err` when the store fails or does not answer in time
    pub async fn report(&self, link: &Link) -> storage::Result<Report> {
        let values = CreateReportValues {
            original_url: &link.original_url,
            created_at: self.clock.now(),
        };

        let report = bounded(self.store_timeout, self.storage.create_report(&values)).await?;

        tracing::info!("Report received for {}", link.original_url);

        Ok(report)
    }
}
