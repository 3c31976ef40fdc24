#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Extension;
use axum::Router;
use axum::middleware;
use axum::routing::get;
use axum_client_ip::ClientIpSource;
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

use crate::admins::ensure_initial_admin;
use crate::analytics::Analytics;
use crate::api::JwtKeys;
use crate::api::StoreTimeout;
use crate::captcha::CaptchaVerifier;
use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::config::IdentityConfig;
use crate::rate_limit::RateLimiter;
use crate::shortener::Shortener;
use crate::storage::Memory;
use crate::storage::Postgres;
use crate::storage::Storage;
use crate::tokens::RandomTokens;
use crate::tokens::TokenGenerator;
use crate::tokens::collision_probability;

mod admins;
mod analytics;
mod api;
mod captcha;
mod client_ip;
mod clock;
mod config;
mod expiry;
mod graceful_shutdown;
mod links;
mod password;
mod rate_limit;
mod reports;
mod root;
mod shortener;
mod storage;
#[cfg(test)]
mod tests;
mod tokens;
mod utils;
mod views;

const DEFAULT_RUST_LOG: &str = "snipr=info,tower_http=info";
const DEBUG_RUST_LOG: &str = "snipr=debug,tower_http=debug";
const DATABASE_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();

    let config = Config::from_env()?;
    let _guard = setup_tracing(&config)?;

    let tasks = TaskTracker::new();
    let services = Services::from_config(&config, tasks.clone())?;

    let app = setup_app(&config, services).await?;

    let listener = TcpListener::bind(config.address).await?;
    tracing::info!("Listening on {}", config.address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(graceful_shutdown::handler())
    .await?;

    tasks.close();
    tracing::info!("Waiting for {} view recording(s) to finish", tasks.len());
    tasks.wait().await;

    Ok(())
}

/// Collaborators of the core that can be swapped out
pub struct Services {
    /// Source of `now`
    pub clock: Arc<dyn Clock>,

    /// Source of candidate short tokens
    pub tokens: Arc<dyn TokenGenerator>,

    /// Checks captcha tokens
    pub captcha: Arc<dyn CaptchaVerifier>,

    /// Tracks background work, like recording views
    pub tasks: TaskTracker,
}

impl Services {
    /// The real thing
    ///
    /// # Errors
    ///
    /// Will return `Err` when the captcha verifier can not be set up
    pub fn from_config(config: &Config, tasks: TaskTracker) -> Result<Self> {
        Ok(Self {
            clock: Arc::new(SystemClock),
            tokens: Arc::new(RandomTokens),
            captcha: captcha::from_config(&config.captcha)?,
            tasks,
        })
    }
}

/// Create and setup the app with its dependencies
///
/// Postgres is used when `DATABASE_URL` is set, memory otherwise
///
/// # Errors
///
/// Will return `Err` if any of its dependencies fail to load:
/// - Database connection
/// - Initial admin setup
pub async fn setup_app(config: &Config, services: Services) -> Result<Router> {
    if let Some(database_url) = &config.database_url {
        let storage = Postgres::connect(database_url, DATABASE_ACQUIRE_TIMEOUT).await?;

        tracing::info!("Using Postgres storage");

        setup_with_storage(storage, config, services).await
    } else {
        tracing::warn!("`DATABASE_URL` is not set, links are kept in memory only");

        setup_with_storage(Memory::new(), config, services).await
    }
}

/// Create and setup the app on top of the given storage
///
/// # Errors
///
/// Will return `Err` when the storage can not be reached or the initial admin can not be created
pub async fn setup_with_storage<S: Storage>(
    storage: S,
    config: &Config,
    services: Services,
) -> Result<Router> {
    ensure_initial_admin(&storage, &config.initial_admin).await?;

    log_token_space(&storage, config).await?;

    let shortener = Shortener::new(
        storage.clone(),
        Arc::clone(&services.clock),
        services.tokens,
        config,
    );

    let analytics = Analytics::new(
        storage.clone(),
        services.clock,
        services.tasks,
        config.store_timeout,
    );

    Ok(create_router(
        storage,
        shortener,
        analytics,
        services.captcha,
        config,
    ))
}

/// Create the router for Snipr
fn create_router<S: Storage>(
    storage: S,
    shortener: Shortener<S>,
    analytics: Analytics<S>,
    captcha: Arc<dyn CaptchaVerifier>,
    config: &Config,
) -> Router {
    let jwt_keys = setup_jwt_keys(&config.identity);
    let default_limiter = RateLimiter::new("default", config.rate_limits.default);

    Router::new()
        .merge(api::router::<S>(&config.rate_limits))
        .route("/{short_token}", get(root::root::<S>))
        .fallback(root::fallback)
        .layer(middleware::from_fn_with_state(
            default_limiter,
            rate_limit::enforce,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(ClientIpSource::ConnectInfo.into_extension())
        .layer(Extension(storage))
        .layer(Extension(shortener))
        .layer(Extension(analytics))
        .layer(Extension(captcha))
        .layer(Extension(jwt_keys))
        .layer(Extension(StoreTimeout(config.store_timeout)))
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing(config: &Config) -> Result<Option<WorkerGuard>> {
    use tracing_appender::rolling;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    let default_rust_log = if config.debug {
        DEBUG_RUST_LOG
    } else {
        DEFAULT_RUST_LOG
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_rust_log));

    // optional second output, daily rotated files
    let (file_layer, guard) = match &config.log_dir {
        Some(log_dir) => {
            let appender = rolling::Builder::new()
                .rotation(rolling::Rotation::DAILY)
                .filename_prefix("snipr")
                .filename_suffix("log")
                .build(log_dir)?;

            let (writer, guard) = tracing_appender::non_blocking(appender);

            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

fn setup_jwt_keys(identity: &IdentityConfig) -> JwtKeys {
    use crate::password::generate;

    let jwt_secret = identity.secret.clone().unwrap_or_else(|| {
        let jwt_secret = generate();
        tracing::info!("`JWT_SECRET` is not set, generating temporary one: {jwt_secret}");
        jwt_secret
    });

    JwtKeys::new(jwt_secret.as_bytes(), identity.lifetime_seconds)
}

/// Tell operators how full the token space is
async fn log_token_space<S: Storage>(storage: &S, config: &Config) -> Result<()> {
    let length = config.short_tokens.length;
    let links = storage.count_links().await?;

    tracing::info!(
        "{links} links stored, collision probability at token length {length}: {:.6}%",
        collision_probability(links, length) * 100.0
    );

    tracing::debug!(
        "{} expiry options configured",
        config.expiry_options.len()
    );

    Ok(())
}
