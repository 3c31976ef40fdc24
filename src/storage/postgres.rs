//! Postgres storage

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
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

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// Columns of the links table, in `Link` order
const LINK_COLUMNS: &str = r"
    id,
    short_token,
    original_url,
    created_at,
    submitter_ip,
    expires_at,
    safe_view_count,
    unsafe_view_count
";

/// Postgres storage
#[derive(Clone)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Connect to Postgres
    ///
    /// Migrations will be run
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self> {
        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(connection_error)?;

        Self::new_with_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    pub async fn new_with_pool(connection_pool: PgPool) -> Result<Self> {
        MIGRATOR
            .run(&connection_pool)
            .await
            .map_err(|err| Error::Connection(format!("Migrations could not run: {err}")))?;

        Ok(Self { connection_pool })
    }
}

/// Convert a count from Postgres
fn to_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

/// Convert a limit or offset for Postgres
fn to_bind(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl Storage for Postgres {
    async fn find_any_admin(&self) -> Result<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(
            r"
            SELECT id, username, hashed_password, created_at
            FROM admins
            LIMIT 1
            ",
        )
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(admin)
    }

    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(
            r"
            SELECT id, username, hashed_password, created_at
            FROM admins
            WHERE username = $1
            LIMIT 1
            ",
        )
        .bind(username)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(admin)
    }

    async fn create_admin(&self, values: &CreateAdminValues) -> Result<Admin> {
        let admin = sqlx::query_as::<_, Admin>(
            r"
            INSERT INTO admins (id, username, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id, username, hashed_password, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(values.username)
        .bind(values.hashed_password)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(insert_error)?;

        Ok(admin)
    }

    async fn create_link(&self, values: &CreateLinkValues) -> Result<Link> {
        let link = sqlx::query_as::<_, Link>(&format!(
            r"
            INSERT INTO links (id, short_token, original_url, created_at, submitter_ip, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {LINK_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(values.short_token)
        .bind(values.original_url)
        .bind(values.created_at)
        .bind(values.submitter_ip)
        .bind(values.expires_at)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(insert_error)?;

        Ok(link)
    }

    async fn find_live_link_by_token(
        &self,
        short_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Link>> {
        let link = sqlx::query_as::<_, Link>(&format!(
            r"
            SELECT {LINK_COLUMNS}
            FROM links
            WHERE short_token = $1
                AND (expires_at IS NULL OR expires_at > $2)
            LIMIT 1
            "
        ))
        .bind(short_token)
        .bind(now)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(link)
    }

    async fn find_link_by_token(&self, short_token: &str) -> Result<Option<Link>> {
        let link = sqlx::query_as::<_, Link>(&format!(
            r"
            SELECT {LINK_COLUMNS}
            FROM links
            WHERE short_token = $1
            LIMIT 1
            "
        ))
        .bind(short_token)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(link)
    }

    async fn find_links(&self, pagination: &Pagination) -> Result<Vec<Link>> {
        let links = sqlx::query_as::<_, Link>(&format!(
            r"
            SELECT {LINK_COLUMNS}
            FROM links
            ORDER BY created_at DESC, id ASC
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(to_bind(pagination.limit()))
        .bind(to_bind(pagination.offset()))
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(links)
    }

    async fn count_links(&self) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM links")
            .fetch_one(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        Ok(to_count(count))
    }

    async fn delete_link(&self, short_token: &str) -> Result<bool> {
        let mut transaction = self
            .connection_pool
            .begin()
            .await
            .map_err(connection_error)?;

        let deleted = sqlx::query("DELETE FROM links WHERE short_token = $1")
            .bind(short_token)
            .execute(&mut *transaction)
            .await
            .map_err(connection_error)?
            .rows_affected();

        sqlx::query("DELETE FROM view_events WHERE short_token = $1")
            .bind(short_token)
            .execute(&mut *transaction)
            .await
            .map_err(connection_error)?;

        transaction.commit().await.map_err(connection_error)?;

        Ok(deleted > 0)
    }

    async fn delete_all_links(&self) -> Result<u64> {
        let mut transaction = self
            .connection_pool
            .begin()
            .await
            .map_err(connection_error)?;

        let deleted = sqlx::query("DELETE FROM links")
            .execute(&mut *transaction)
            .await
            .map_err(connection_error)?
            .rows_affected();

        sqlx::query("DELETE FROM view_events")
            .execute(&mut *transaction)
            .await
            .map_err(connection_error)?;

        transaction.commit().await.map_err(connection_error)?;

        Ok(deleted)
    }

    async fn record_view(&self, values: &RecordViewValues) -> Result<()> {
        let mut transaction = self
            .connection_pool
            .begin()
            .await
            .map_err(connection_error)?;

        let increment = match values.kind {
            ViewKind::Safe => {
                "UPDATE links SET safe_view_count = safe_view_count + 1 WHERE short_token = $1"
            }
            ViewKind::Unsafe => {
                "UPDATE links SET unsafe_view_count = unsafe_view_count + 1 WHERE short_token = $1"
            }
        };

        let updated = sqlx::query(increment)
            .bind(values.short_token)
            .execute(&mut *transaction)
            .await
            .map_err(connection_error)?;

        // the link was deleted after it resolved, its views are gone as well
        if updated.rows_affected() == 0 {
            return Ok(());
        }

        sqlx::query(
            r"
            INSERT INTO view_events (id, short_token, client_ip, user_agent, is_safe, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(Uuid::new_v4())
        .bind(values.short_token)
        .bind(values.client_ip)
        .bind(values.user_agent)
        .bind(values.kind.is_safe())
        .bind(values.created_at)
        .execute(&mut *transaction)
        .await
        .map_err(connection_error)?;

        transaction.commit().await.map_err(connection_error)?;

        Ok(())
    }

    async fn find_recent_views(&self, short_token: &str, limit: u64) -> Result<Vec<ViewEvent>> {
        let views = sqlx::query_as::<_, ViewEvent>(
            r"
            SELECT id, short_token, client_ip, user_agent, is_safe, created_at
            FROM view_events
            WHERE short_token = $1
            ORDER BY created_at DESC, id ASC
            LIMIT $2
            ",
        )
        .bind(short_token)
        .bind(to_bind(limit))
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(views)
    }

    async fn create_report(&self, values: &CreateReportValues) -> Result<Report> {
        let report = sqlx::query_as::<_, Report>(
            r"
            INSERT INTO reports (id, original_url, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, original_url, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(values.original_url)
        .bind(values.created_at)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(report)
    }

    async fn find_reports(&self, pagination: &Pagination) -> Result<Vec<Report>> {
        let reports = sqlx::query_as::<_, Report>(
            r"
            SELECT id, original_url, created_at
            FROM reports
            ORDER BY created_at DESC, id ASC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(to_bind(pagination.limit()))
        .bind(to_bind(pagination.offset()))
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(reports)
    }

    async fn count_reports(&self) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports")
            .fetch_one(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        Ok(to_count(count))
    }

    async fn delete_report(&self, id: &Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.connection_pool)
            .await
            .map_err(connection_error)?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn delete_all_reports(&self) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM reports")
            .execute(&self.connection_pool)
            .await
            .map_err(connection_error)?
            .rows_affected();

        Ok(deleted)
    }
}

/// Convert `SQLx` to storage connection error
fn connection_error<E>(err: E) -> Error
where
    E: std::error::Error,
{
    Error::Connection(err.to_string())
}

/// Convert `SQLx` insert errors, unique violations become conflicts
fn insert_error(err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::Database(ref database_error) if database_error.is_unique_violation() => {
            Error::Conflict(database_error.message().to_string())
        }
        err => connection_error(err),
    }
}
