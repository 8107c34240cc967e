//! Mock transport for testing without network access.
//!
//! Serves canned feed bodies from memory or from a directory of JSON files,
//! and counts requests per URL so callers can observe cache behaviour.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use super::error::GbfsError;
use super::transport::FeedTransport;

/// A canned response: either a body or a transport failure message.
type Canned = Result<Vec<u8>, String>;

/// Mock transport that serves feed bodies keyed by URL.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: RwLock<HashMap<String, Canned>>,
    requests: Mutex<HashMap<String, usize>>,
}

impl MockTransport {
    /// Create an empty mock. Unknown URLs fail with a transport error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.json` file in `data_dir`, served as `{base_url}/{file name}`.
    ///
    /// For example `gbfs.json` in the directory is served at
    /// `http://localhost/gbfs.json` when `base_url` is `http://localhost`.
    pub fn from_dir(base_url: &str, data_dir: impl AsRef<Path>) -> Result<Self, GbfsError> {
        let data_dir = data_dir.as_ref();
        let base_url = base_url.trim_end_matches('/');
        let io_error = |e: std::io::Error| {
            GbfsError::Config(format!(
                "failed to read mock data from {}: {e}",
                data_dir.display()
            ))
        };

        let mock = Self::new();
        for entry in std::fs::read_dir(data_dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            let body = std::fs::read(&path).map_err(io_error)?;
            mock.insert(format!("{base_url}/{file_name}"), Ok(body));
        }

        Ok(mock)
    }

    /// Serve `body` at `url`, replacing any previous response.
    pub fn with_feed(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.set_feed(url, body);
        self
    }

    /// Fail every request to `url` with a transport error.
    pub fn with_failure(self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.set_failure(url, message);
        self
    }

    /// Replace the body served at `url`.
    pub fn set_feed(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.insert(url.into(), Ok(body.into()));
    }

    /// Make requests to `url` fail.
    pub fn set_failure(&self, url: impl Into<String>, message: impl Into<String>) {
        self.insert(url.into(), Err(message.into()));
    }

    /// Number of requests made for `url`.
    pub fn request_count(&self, url: &str) -> usize {
        let requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        requests.get(url).copied().unwrap_or(0)
    }

    /// Total number of requests made.
    pub fn total_requests(&self) -> usize {
        let requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        requests.values().sum()
    }

    /// URLs with a canned response.
    pub fn urls(&self) -> Vec<String> {
        let responses = self.responses.read().unwrap_or_else(|e| e.into_inner());
        let mut urls: Vec<String> = responses.keys().cloned().collect();
        urls.sort();
        urls
    }

    fn insert(&self, url: String, response: Canned) {
        let mut responses = self.responses.write().unwrap_or_else(|e| e.into_inner());
        responses.insert(url, response);
    }
}

impl FeedTransport for MockTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, GbfsError> {
        {
            let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
            *requests.entry(url.to_string()).or_default() += 1;
        }

        let responses = self.responses.read().unwrap_or_else(|e| e.into_inner());
        match responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(GbfsError::transport(url, message.clone())),
            None => Err(GbfsError::transport(url, "HTTP status 404 Not Found")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn serves_canned_bodies_and_counts_requests() {
        let mock = MockTransport::new().with_feed("http://x/gbfs.json", "{}");

        assert_eq!(mock.fetch("http://x/gbfs.json").unwrap(), b"{}");
        assert_eq!(mock.fetch("http://x/gbfs.json").unwrap(), b"{}");
        assert_eq!(mock.request_count("http://x/gbfs.json"), 2);
        assert_eq!(mock.total_requests(), 2);
    }

    #[test]
    fn unknown_url_is_a_transport_error() {
        let mock = MockTransport::new();
        let err = mock.fetch("http://x/missing.json").unwrap_err();
        assert!(matches!(err, GbfsError::Transport { .. }));
        assert_eq!(mock.request_count("http://x/missing.json"), 1);
    }

    #[test]
    fn injected_failure() {
        let mock = MockTransport::new().with_failure("http://x/s.json", "connection reset");
        match mock.fetch("http://x/s.json") {
            Err(GbfsError::Transport { url, message, .. }) => {
                assert_eq!(url, "http://x/s.json");
                assert_eq!(message, "connection reset");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn load_from_dir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("gbfs.json"), r#"{"ttl": 1}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mock = MockTransport::from_dir("http://localhost/", dir.path()).unwrap();

        assert_eq!(mock.urls(), vec!["http://localhost/gbfs.json".to_string()]);
        let body = mock.fetch("http://localhost/gbfs.json").unwrap();
        assert_eq!(body, br#"{"ttl": 1}"#);
    }

    #[test]
    fn missing_dir_is_an_error() {
        let err = MockTransport::from_dir("http://localhost", "/nonexistent/gbfs").unwrap_err();
        assert!(matches!(err, GbfsError::Config(_)));
        assert!(!err.is_retryable());
    }
}
