//! GBFS client error types.

/// How much of an undecodable response body is kept for diagnostics.
pub(crate) const BODY_EXCERPT_CHARS: usize = 500;

/// Errors that can occur when resolving or fetching GBFS feeds.
#[derive(Debug, thiserror::Error)]
pub enum GbfsError {
    /// The feed URL could not be reached, timed out, or answered with a
    /// non-success status.
    #[error("transport error fetching {url}: {message}")]
    Transport {
        url: String,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The response body does not decode into the expected feed shape.
    #[error("decode error for {url}: {message}")]
    Decode {
        url: String,
        message: String,
        body: Option<String>,
    },

    /// The requested language is not advertised by the auto-discovery feed.
    #[error("language not found in auto-discovery response: {0}")]
    LanguageNotFound(String),

    /// No child feed with the requested name exists for the language.
    #[error("feed URL not found for feed name: {0}")]
    FeedNotFound(String),

    /// A client setting is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl GbfsError {
    /// Whether repeating the same call later could succeed.
    ///
    /// Only transport failures are transient; decode and lookup failures
    /// describe the feed contents and will repeat until the feed changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GbfsError::Transport { .. })
    }

    /// Whether the request gave up after the configured timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            GbfsError::Transport { source: Some(e), .. } if e.is_timeout()
        )
    }

    pub(crate) fn transport(url: &str, message: impl Into<String>) -> Self {
        GbfsError::Transport {
            url: url.to_string(),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn decode(url: &str, message: impl Into<String>, body: Option<&[u8]>) -> Self {
        GbfsError::Decode {
            url: url.to_string(),
            message: message.into(),
            body: body.map(|b| {
                String::from_utf8_lossy(b)
                    .chars()
                    .take(BODY_EXCERPT_CHARS)
                    .collect()
            }),
        }
    }
}
