use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

/// An abuse report of a shortened URL
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Report {
    pub id: Uuid,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
}
