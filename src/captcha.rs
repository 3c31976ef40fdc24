//! Captcha verification
//!
//! Shortening and reporting require a reCAPTCHA v3 token from the client

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::CaptchaConfig;

const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Checks captcha tokens sent by clients
#[async_trait]
pub trait CaptchaVerifier: Send + Sync + 'static {
    /// Is this a token of a human?
    async fn verify(&self, token: &str, remote_ip: Option<IpAddr>) -> bool;
}

/// Answer of the siteverify endpoint
#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,

    /// Only sent for v3 tokens
    score: Option<f64>,

    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Google reCAPTCHA v3
pub struct ReCaptcha {
    client: Client,
    secret: String,
    score_threshold: f64,
}

impl ReCaptcha {
    pub fn new(secret: String, score_threshold: f64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Could not build HTTP client for captcha verification")?;

        Ok(Self {
            client,
            secret,
            score_threshold,
        })
    }

    /// The secret goes in the form body, never in the URL
    fn siteverify_request(
        &self,
        token: &str,
        remote_ip: Option<IpAddr>,
    ) -> reqwest::Result<reqwest::Request> {
        let mut params = vec![("secret", self.secret.clone()), ("response", token.to_string())];
        if let Some(remote_ip) = remote_ip {
            params.push(("remoteip", remote_ip.to_string()));
        }

        self.client.post(SITEVERIFY_URL).form(&params).build()
    }

    async fn siteverify(
        &self,
        token: &str,
        remote_ip: Option<IpAddr>,
    ) -> Result<SiteverifyResponse> {
        let request = self.siteverify_request(token, remote_ip)?;

        let response = self
            .client
            .execute(request)
            .await?
            .error_for_status()?
            .json::<SiteverifyResponse>()
            .await?;

        Ok(response)
    }
}

#[async_trait]
impl CaptchaVerifier for ReCaptcha {
    async fn verify(&self, token: &str, remote_ip: Option<IpAddr>) -> bool {
        match self.siteverify(token, remote_ip).await {
            Ok(response) => {
                let passed = response.success
                    && response
                        .score
                        .is_some_and(|score| score >= self.score_threshold);

                if !passed {
                    tracing::debug!(
                        "Captcha rejected, score {:?}, errors {:?}",
                        response.score,
                        response.error_codes
                    );
                }

                passed
            }
            Err(err) => {
                tracing::warn!("Could not verify captcha: {err}");

                false
            }
        }
    }
}

/// Accepts every token, for local development
pub struct DisabledCaptcha;

#[async_trait]
impl CaptchaVerifier for DisabledCaptcha {
    async fn verify(&self, _token: &str, _remote_ip: Option<IpAddr>) -> bool {
        true
    }
}

/// Pick the verifier matching the configuration
///
/// # Errors
///
/// Will return `Err` when the HTTP client can not be built or the secret is missing
pub fn from_config(config: &CaptchaConfig) -> Result<Arc<dyn CaptchaVerifier>> {
    if config.debug {
        tracing::warn!("Captcha debug mode is enabled, every captcha passes");

        return Ok(Arc::new(DisabledCaptcha));
    }

    let secret = config
        .secret
        .clone()
        .context("`CAPTCHA_SECRET_KEY` is not set")?;

    Ok(Arc::new(ReCaptcha::new(secret, config.score_threshold)?))
}
