//! Service configuration
//!
//! Read once from the environment at startup and handed to whoever needs it

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use anyhow::bail;

use crate::expiry::DEFAULT_EXPIRY_OPTIONS;
use crate::expiry::ExpiryOptions;
use crate::rate_limit::RateLimit;
use crate::utils::env_flag;
use crate::utils::env_var;
use crate::utils::env_var_or_else;
use crate::utils::env_var_parsed_or;

const DEFAULT_ADDRESS: &str = "0.0.0.0:4000";
const DEFAULT_SHORT_URL_LENGTH: usize = 6;
const DEFAULT_SHORT_URL_MAX_ATTEMPTS: u32 = 16;
const DEFAULT_STORE_TIMEOUT_SECONDS: u64 = 5;
const DEFAULT_CAPTCHA_SCORE_THRESHOLD: f64 = 0.5;
const DEFAULT_JWT_ACCESS_TOKEN_EXPIRES: i64 = 8 * 60 * 60;
const MAX_JWT_ACCESS_TOKEN_EXPIRES: i64 = 365 * 24 * 60 * 60;
const DEFAULT_RATE_LIMIT: &str = "500 per hour";
const DEFAULT_RATE_LIMIT_SHORTEN: &str = "50 per minute";
const DEFAULT_RATE_LIMIT_REPORT: &str = "10 per minute";

/// Complete service configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Address to listen on
    pub address: SocketAddr,

    /// Postgres connection string, links are kept in memory without one
    pub database_url: Option<String>,

    /// Log verbosely by default
    pub debug: bool,

    /// Also write logs to daily rotated files in this directory
    pub log_dir: Option<String>,

    /// Short token settings
    pub short_tokens: ShortTokenConfig,

    /// Allowed expiry selectors
    pub expiry_options: ExpiryOptions,

    /// Upper bound of a single store call
    pub store_timeout: Duration,

    /// Captcha verification
    pub captcha: CaptchaConfig,

    /// Admin identity tokens
    pub identity: IdentityConfig,

    /// Per client rate limits
    pub rate_limits: RateLimitConfig,

    /// Admin created when there is none yet
    pub initial_admin: InitialAdminConfig,
}

/// Short token settings
#[derive(Clone, Copy, Debug)]
pub struct ShortTokenConfig {
    /// Length of newly issued tokens
    pub length: usize,

    /// Candidates to try before giving up on an allocation
    pub max_attempts: u32,
}

/// Captcha verification settings
#[derive(Clone, Debug)]
pub struct CaptchaConfig {
    /// Accept every captcha token, for local development only
    pub debug: bool,

    /// reCAPTCHA v3 secret key
    pub secret: Option<String>,

    /// Minimal reCAPTCHA v3 score to pass
    pub score_threshold: f64,
}

/// Admin identity token settings
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    /// Signing secret, a temporary one is generated when missing
    pub secret: Option<String>,

    /// Lifetime of issued tokens in seconds
    pub lifetime_seconds: i64,
}

/// Per client rate limits
#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
    /// Limit over all routes
    pub default: RateLimit,

    /// Limit for shortening URLs
    pub shorten: RateLimit,

    /// Limit for reporting URLs
    pub report: RateLimit,
}

/// Credentials of the bootstrap admin
#[derive(Clone, Debug, Default)]
pub struct InitialAdminConfig {
    /// Username, generated when missing
    pub username: Option<String>,

    /// Password, generated when missing
    pub password: Option<String>,
}

impl Config {
    /// Build the configuration from environment variables
    ///
    /// # Errors
    ///
    /// Will return `Err` when a variable is set to something that can not be used
    pub fn from_env() -> Result<Self> {
        let short_tokens = ShortTokenConfig {
            length: env_var_parsed_or("SHORT_URL_LENGTH", DEFAULT_SHORT_URL_LENGTH)?,
            max_attempts: env_var_parsed_or(
                "SHORT_URL_MAX_ATTEMPTS",
                DEFAULT_SHORT_URL_MAX_ATTEMPTS,
            )?,
        };

        if short_tokens.length == 0 {
            bail!("`SHORT_URL_LENGTH` must be at least 1");
        }

        if short_tokens.max_attempts == 0 {
            bail!("`SHORT_URL_MAX_ATTEMPTS` must be at least 1");
        }

        let expiry_options = env_var_or_else("EXPIRY_OPTIONS", || {
            DEFAULT_EXPIRY_OPTIONS.to_string()
        })
        .parse::<ExpiryOptions>()?;

        let captcha = CaptchaConfig {
            debug: env_flag("CAPTCHA_DEBUG_MODE"),
            secret: env_var("CAPTCHA_SECRET_KEY"),
            score_threshold: env_var_parsed_or(
                "CAPTCHA_SCORE_THRESHOLD",
                DEFAULT_CAPTCHA_SCORE_THRESHOLD,
            )?,
        };

        if !captcha.debug && captcha.secret.is_none() {
            bail!("`CAPTCHA_SECRET_KEY` must be set unless `CAPTCHA_DEBUG_MODE` is enabled");
        }

        let identity = IdentityConfig {
            secret: env_var("JWT_SECRET"),
            lifetime_seconds: env_var_parsed_or(
                "JWT_ACCESS_TOKEN_EXPIRES",
                DEFAULT_JWT_ACCESS_TOKEN_EXPIRES,
            )?,
        };

        check_jwt_lifetime(identity.lifetime_seconds)?;

        let rate_limits = RateLimitConfig {
            default: env_var_or_else("RATE_LIMIT_DEFAULT", || DEFAULT_RATE_LIMIT.to_string())
                .parse()?,
            shorten: env_var_or_else("RATE_LIMIT_SHORTEN", || {
                DEFAULT_RATE_LIMIT_SHORTEN.to_string()
            })
            .parse()?,
            report: env_var_or_else("RATE_LIMIT_REPORT", || {
                DEFAULT_RATE_LIMIT_REPORT.to_string()
            })
            .parse()?,
        };

        Ok(Self {
            address: setup_address()?,
            database_url: env_var("DATABASE_URL"),
            debug: env_flag("DEBUG_MODE"),
            log_dir: env_var("LOG_DIR"),
            short_tokens,
            expiry_options,
            store_timeout: Duration::from_secs(env_var_parsed_or(
                "STORE_TIMEOUT_SECONDS",
                DEFAULT_STORE_TIMEOUT_SECONDS,
            )?),
            captcha,
            identity,
            rate_limits,
            initial_admin: InitialAdminConfig {
                username: env_var("INITIAL_USERNAME"),
                password: env_var("INITIAL_PASSWORD"),
            },
        })
    }
}

fn setup_address() -> Result<SocketAddr> {
    let mut address =
        env_var_or_else("ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

    // optional override of just the port
    if let Some(port) = env_var("PORT") {
        address.set_port(port.parse::<u16>()?);
    }

    Ok(address)
}

fn check_jwt_lifetime(lifetime_seconds: i64) -> Result<()> {
    if !(1..=MAX_JWT_ACCESS_TOKEN_EXPIRES).contains(&lifetime_seconds) {
        bail!(
            "`JWT_ACCESS_TOKEN_EXPIRES` must be between 1 and {MAX_JWT_ACCESS_TOKEN_EXPIRES} seconds"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_jwt_lifetime() {
        assert!(check_jwt_lifetime(DEFAULT_JWT_ACCESS_TOKEN_EXPIRES).is_ok());
        assert!(check_jwt_lifetime(MAX_JWT_ACCESS_TOKEN_EXPIRES).is_ok());

        assert!(check_jwt_lifetime(0).is_err());
        assert!(check_jwt_lifetime(-1).is_err());
        assert!(check_jwt_lifetime(MAX_JWT_ACCESS_TOKEN_EXPIRES + 1).is_err());
        assert!(check_jwt_lifetime(i64::MAX).is_err());
    }
}
