//! Issue short tokens for URLs and resolve them again
//!
//! A candidate token is drawn at random and inserted; when the store reports the token as taken a
//! new candidate is drawn. Uniqueness is never checked before the insert, the store rejecting a
//! duplicate is what keeps two concurrent allocations apart.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::clock::Clock;
use crate::config::Config;
use crate::expiry::ExpiryOptions;
use crate::expiry::InvalidExpiry;
use crate::links::Link;
use crate::storage;
use crate::storage::CreateLinkValues;
use crate::storage::Storage;
use crate::storage::bounded;
use crate::tokens::TokenGenerator;
use crate::tokens::is_reserved;
use crate::tokens::is_well_formed;

/// Errors of shortening and resolving
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShortenError {
    /// The expiry selector is not one of the configured ones
    #[error("Invalid expiry value: {0:?}")]
    InvalidExpiry(String),

    /// The store could not complete the operation
    #[error("Store unavailable")]
    StoreUnavailable,
}

impl From<InvalidExpiry> for ShortenError {
    fn from(err: InvalidExpiry) -> Self {
        Self::InvalidExpiry(err.0)
    }
}

/// Allocates and resolves short tokens
#[derive(Clone)]
pub struct Shortener<S: Storage> {
    /// Where the links live
    storage: S,

    /// Source of `now`
    clock: Arc<dyn Clock>,

    /// Source of candidate tokens
    tokens: Arc<dyn TokenGenerator>,

    /// Length of new tokens
    length: usize,

    /// Candidates to try before giving up
    max_attempts: u32,

    /// Allowed expiry selectors
    expiry_options: ExpiryOptions,

    /// Bound on every store call
    store_timeout: Duration,
}

impl<S: Storage> Shortener<S> {
    /// Create a shortener with its collaborators
    pub fn new(
        storage: S,
        clock: Arc<dyn Clock>,
        tokens: Arc<dyn TokenGenerator>,
        config: &Config,
    ) -> Self {
        Self {
            storage,
            clock,
            tokens,
            length: config.short_tokens.length,
            max_attempts: config.short_tokens.max_attempts,
            expiry_options: config.expiry_options.clone(),
            store_timeout: config.store_timeout,
        }
    }

    /// Store a new link for `url` under a fresh short token
    ///
    /// The URL has to be validated already, it is stored exactly as given. This only handles the
    /// expiry selector
    ///
    /// # Errors
    ///
    /// Will return `Err` for an unknown expiry selector, or when the store fails or no free
    /// token was found within the configured number of attempts
    pub async fn allocate(
        &self,
        url: &str,
        submitter_ip: Option<IpAddr>,
        expiry: Option<&str>,
    ) -> Result<Link, ShortenError> {
        let now = self.clock.now();
        let expires_at = self.expiry_options.resolve(expiry, now)?;
        let submitter_ip = submitter_ip.map(|ip_address| ip_address.to_string());

        for attempt in 1..=self.max_attempts {
            let short_token = self.tokens.generate(self.length);

            if is_reserved(&short_token) {
                tracing::debug!("Short token `{short_token}` is reserved, drawing another one");
                continue;
            }

            let values = CreateLinkValues {
                short_token: &short_token,
                original_url: url,
                submitter_ip: submitter_ip.as_deref(),
                created_at: now,
                expires_at,
            };

            match bounded(self.store_timeout, self.storage.create_link(&values)).await {
                Ok(link) => {
                    tracing::debug!(
                        "Short token `{}` allocated for {} after {attempt} attempt(s)",
                        link.short_token,
                        link.original_url
                    );

                    return Ok(link);
                }
                Err(storage::Error::Conflict(_)) => {
                    tracing::debug!("Short token `{short_token}` is taken, drawing another one");
                }
                Err(err) => {
                    tracing::error!("Could not store link: {err}");

                    return Err(ShortenError::StoreUnavailable);
                }
            }
        }

        tracing::error!(
            "No free short token of length {} found in {} attempts, consider raising `SHORT_URL_LENGTH`",
            self.length,
            self.max_attempts
        );

        Err(ShortenError::StoreUnavailable)
    }

    /// Find the live link behind a short token
    ///
    /// Unknown and expired tokens are both `None`
    ///
    /// # Errors
    ///
    /// Will return `Err` when the store fails or does not answer in time
    pub async fn resolve(&self, short_token: &str) -> Result<Option<Link>, ShortenError> {
        if !is_well_formed(short_token) {
            tracing::debug!("Short token `{short_token}` can never exist");

            return Ok(None);
        }

        bounded(
            self.store_timeout,
            self.storage
                .find_live_link_by_token(short_token, self.clock.now()),
        )
        .await
        .map_err(|err| {
            tracing::error!("Could not look up short token `{short_token}`: {err}");

            ShortenError::StoreUnavailable
        })
    }
}
