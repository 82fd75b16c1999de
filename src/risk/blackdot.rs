//! BlackDot (`getipintel.net`) reputation source.
//!
//! The service answers `GET ?ip=&contact=&flags=&format=json` with
//! `{"status": "success", "result": "<score>"}`. A score of `1` means the address
//! is on the ban list, `0` means it is not; anything in between is a probability
//! that only bans once it reaches the configured threshold. Negative scores are
//! service-side errors.

use super::{Listing, ReputationSource};
use crate::config::BlackDotConfig;
use crate::error::{ConfigError, RiskError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub struct BlackDotSource {
    client: Client,
    url: Url,
    contact: SecretString,
    flags: Option<String>,
    ban_threshold: f64,
}

impl BlackDotSource {
    /// # Errors
    /// Returns `ConfigError` if the URL is invalid, the contact is blank, the ban
    /// threshold is outside `(0, 1]` or the HTTP client cannot be built.
    pub fn new(config: &BlackDotConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let url = Url::parse(&config.url)
            .map_err(|e| ConfigError::InvalidSourceUrl(format!("{}: {e}", config.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidSourceUrl(format!(
                "{}: unsupported scheme {}",
                config.url,
                url.scheme()
            )));
        }

        if config.contact.expose_secret().trim().is_empty() {
            return Err(ConfigError::BlankContact);
        }

        // A score of 0 is a confirmed absence and must never ban.
        if !(config.ban_threshold > 0.0 && config.ban_threshold <= 1.0) {
            return Err(ConfigError::InvalidBanThreshold(
                config.ban_threshold.to_string(),
            ));
        }

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidSourceUrl(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            contact: config.contact.clone(),
            flags: config.flags.clone().filter(|f| !f.trim().is_empty()),
            ban_threshold: config.ban_threshold,
        })
    }

    fn query_url(&self, address: IpAddr) -> Url {
        let mut url = self.url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("ip", &address.to_string())
                .append_pair("contact", self.contact.expose_secret())
                .append_pair("format", "json");
            if let Some(flags) = &self.flags {
                query.append_pair("flags", flags);
            }
        }
        url
    }
}

impl ReputationSource for BlackDotSource {
    fn name(&self) -> &'static str {
        "blackdot"
    }

    #[instrument(skip(self))]
    async fn lookup(&self, address: IpAddr) -> Result<Listing, RiskError> {
        let response = self
            .client
            .get(self.query_url(address))
            .send()
            .await
            .map_err(|e| RiskError::SourceUnavailable(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RiskError::SourceUnavailable(format!(
                "{} - {status}",
                self.url
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RiskError::SourceUnavailable(format!("malformed response: {e}")))?;

        debug!(response = %body, "blackdot response");

        classify(&body, self.ban_threshold)
    }
}

impl std::fmt::Debug for BlackDotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlackDotSource")
            .field("url", &self.url.as_str())
            .field("contact", &"***")
            .field("flags", &self.flags)
            .field("ban_threshold", &self.ban_threshold)
            .finish()
    }
}

/// Turn a BlackDot JSON body into a listing.
///
/// # Errors
/// Returns `RiskError::SourceUnavailable` for error statuses, negative scores and
/// bodies without a numeric `result`.
pub fn classify(body: &Value, ban_threshold: f64) -> Result<Listing, RiskError> {
    if let Some(status) = body["status"].as_str() {
        if status != "success" {
            let message = body["message"].as_str().unwrap_or("no message");
            return Err(RiskError::SourceUnavailable(format!(
                "service returned {status}: {message}"
            )));
        }
    }

    let score = match &body["result"] {
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
    .filter(|score| score.is_finite())
    .ok_or_else(|| RiskError::SourceUnavailable("response has no numeric result".to_string()))?;

    if score < 0.0 {
        return Err(RiskError::SourceUnavailable(format!(
            "service error code {score}"
        )));
    }

    Ok(Listing {
        listed: score >= ban_threshold,
        score: Some(score),
    })
}
