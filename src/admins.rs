use anyhow::Result;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::config::InitialAdminConfig;
use crate::password::generate;
use crate::password::hash;
use crate::storage::CreateAdminValues;
use crate::storage::Storage;

/// Someone allowed to manage links and reports
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub username: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
}

/// Create the first admin when there is none yet
///
/// Missing credentials are generated and logged, once
pub async fn ensure_initial_admin<S: Storage>(
    storage: &S,
    initial_admin: &InitialAdminConfig,
) -> Result<()> {
    let admin = storage.find_any_admin().await?;

    if admin.is_none() {
        let username = initial_admin.username.clone().unwrap_or_else(|| {
            let initial_username = Uuid::new_v4().to_string();
            tracing::info!(
                "`INITIAL_USERNAME` not set, generating new username: {initial_username}"
            );
            initial_username
        });

        let password = initial_admin.password.clone().unwrap_or_else(|| {
            let initial_password = generate();
            tracing::info!(
                "`INITIAL_PASSWORD` not set, generating new password: {initial_password}"
            );
            initial_password
        });

        let hashed_password = hash(&password)?;

        let values = CreateAdminValues {
            username: &username,
            hashed_password: &hashed_password,
        };

        storage.create_admin(&values).await?;

        tracing::info!("Created initial admin `{username}`");
    }

    Ok(())
}
