//! HTTP transport for GBFS feeds.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use super::error::GbfsError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default `User-Agent` sent with every request.
const DEFAULT_USER_AGENT: &str = concat!("gbfs-client/", env!("CARGO_PKG_VERSION"));

/// Fetches raw feed bodies by URL.
///
/// Implementations report unreachable hosts, timeouts and non-success
/// statuses as [`GbfsError::Transport`].
pub trait FeedTransport: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, GbfsError>;
}

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Value of the `User-Agent` header
    pub user_agent: String,
}

impl TransportConfig {
    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Blocking HTTP transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: &TransportConfig) -> Result<Self, GbfsError> {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent).map_err(|_| {
            GbfsError::Config(format!("invalid user agent: {:?}", config.user_agent))
        })?;
        headers.insert(USER_AGENT, user_agent);

        let http = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(GbfsError::ClientBuild)?;

        Ok(Self { http })
    }
}

impl FeedTransport for HttpTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, GbfsError> {
        let transport_error = |e: reqwest::Error| {
            let message = if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            };
            GbfsError::Transport {
                url: url.to_string(),
                message,
                source: Some(e),
            }
        };

        let response = self.http.get(url).send().map_err(transport_error)?;
        let status = response.status();

        if !status.is_success() {
            return Err(GbfsError::transport(url, format!("HTTP status {status}")));
        }

        let body = response.bytes().map_err(transport_error)?;
        Ok(body.to_vec())
    }
}
