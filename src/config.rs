//! Client configuration.

use std::env;
use std::time::Duration;

use crate::error::{CesError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF: u32 = 2;
const DEFAULT_RATE_LIMIT_DELAY_SECS: u64 = 1;

/// Connection settings for a [`CesClient`](crate::CesClient).
///
/// The base URL is the CES instance root (e.g. `https://school.example.com`);
/// the client appends `/api/` itself.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries after a rate-limited (429) response.
    pub max_retries: u32,
    /// Multiplier applied to the delay after each retry.
    pub retry_backoff: u32,
    /// Delay before the first retry when the server sends no `Retry-After`.
    pub rate_limit_delay: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .field("rate_limit_delay", &self.rate_limit_delay)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Configuration with default retry and timeout settings.
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            rate_limit_delay: Duration::from_secs(DEFAULT_RATE_LIMIT_DELAY_SECS),
        }
    }

    /// Read configuration from environment variables.
    ///
    /// - `CES_API_KEY` (required)
    /// - `CES_API_URL` (required)
    /// - `CES_MAX_RETRIES`, `CES_RETRY_BACKOFF`, `CES_RATE_LIMIT_DELAY_SECS`,
    ///   `CES_TIMEOUT_SECS` (optional)
    ///
    /// # Errors
    ///
    /// Returns [`CesError::ConfigMissing`] if a required variable is unset and
    /// [`CesError::InvalidConfig`] if an optional one is not a number.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("CES_API_KEY").map_err(|_| {
            CesError::ConfigMissing("CES_API_KEY environment variable not set".to_string())
        })?;
        let base_url = env::var("CES_API_URL").map_err(|_| {
            CesError::ConfigMissing("CES_API_URL environment variable not set".to_string())
        })?;

        let mut config = Self::new(&api_key, &base_url);
        if let Some(n) = env_number("CES_MAX_RETRIES")? {
            config.max_retries = n as u32;
        }
        if let Some(n) = env_number("CES_RETRY_BACKOFF")? {
            config.retry_backoff = n as u32;
        }
        if let Some(n) = env_number("CES_RATE_LIMIT_DELAY_SECS")? {
            config.rate_limit_delay = Duration::from_secs(n);
        }
        if let Some(n) = env_number("CES_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(n);
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, retry_backoff: u32) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = retry_backoff;
        self
    }

    #[must_use]
    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check and normalise the settings.
    ///
    /// Trims whitespace and trailing slashes. The URL must be non-empty, carry
    /// a scheme and must not already point at `api/`. Plain `http://` is
    /// accepted with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::ConfigMissing`] for empty values and
    /// [`CesError::InvalidConfig`] for a malformed URL.
    pub fn validated(mut self) -> Result<Self> {
        self.api_key = self.api_key.trim().to_string();
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();

        if self.api_key.is_empty() {
            return Err(CesError::ConfigMissing("a non-blank API key".to_string()));
        }
        if self.base_url.is_empty() {
            return Err(CesError::ConfigMissing("a non-blank base URL".to_string()));
        }
        if !self.base_url.contains("://") {
            return Err(CesError::InvalidConfig(format!(
                "'{}' is not an HTTP or HTTPS URL",
                self.base_url
            )));
        }
        if self.base_url.contains("api/") || self.base_url.ends_with("/api") {
            return Err(CesError::InvalidConfig(
                "base URL should not include the API path; remove 'api/'".to_string(),
            ));
        }
        if self.base_url.starts_with("http://") {
            tracing::warn!(
                base_url = %self.base_url,
                "CES may respond unexpectedly to plain HTTP requests; use HTTPS if possible"
            );
        }
        Ok(self)
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = self.retry_backoff.max(1).saturating_pow(attempt);
        self.rate_limit_delay.saturating_mul(factor)
    }
}

fn env_number(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CesError::InvalidConfig(format!("{name} must be a number, got '{raw}'"))),
        Err(_) => Ok(None),
    }
}
