//! Shared feed header and the capability trait every feed document implements.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Error returned when an epoch-seconds field cannot be represented as a
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} value {value} is outside the representable timestamp range")]
pub struct TimestampOutOfRange {
    pub field: &'static str,
    pub value: u64,
}

/// Convert seconds since the Unix epoch into a UTC timestamp.
pub fn epoch_seconds(
    field: &'static str,
    value: u64,
) -> Result<DateTime<Utc>, TimestampOutOfRange> {
    i64::try_from(value)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or(TimestampOutOfRange { field, value })
}

/// Top-level fields present on every GBFS document.
///
/// `last_updated` and `ttl` are read from the wire. The derived fields are
/// filled in by [`FeedHeader::normalize`] after decoding and are never read
/// from the response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedHeader {
    /// Seconds since the Unix epoch at which the publisher last updated the data.
    pub last_updated: u64,

    /// Seconds the data should be considered fresh.
    pub ttl: u64,

    #[serde(skip_deserializing)]
    pub last_updated_timestamp: DateTime<Utc>,

    #[serde(skip_deserializing)]
    pub ttl_duration: Duration,
}

impl FeedHeader {
    /// Create a header from raw wire values, already normalized.
    pub fn new(last_updated: u64, ttl: u64) -> Result<Self, TimestampOutOfRange> {
        let mut header = Self {
            last_updated,
            ttl,
            last_updated_timestamp: DateTime::default(),
            ttl_duration: Duration::ZERO,
        };
        header.normalize()?;
        Ok(header)
    }

    /// Derive `last_updated_timestamp` and `ttl_duration` from the raw fields.
    pub fn normalize(&mut self) -> Result<(), TimestampOutOfRange> {
        self.last_updated_timestamp = epoch_seconds("last_updated", self.last_updated)?;
        self.ttl_duration = Duration::from_secs(self.ttl);
        Ok(())
    }
}

/// A decodable GBFS document with the standard `last_updated`/`ttl` header.
///
/// The fetcher decodes the body, normalizes the header, then runs
/// [`FeedDocument::annotate`] before the document is returned or cached.
pub trait FeedDocument: DeserializeOwned + Send + Sync + 'static {
    /// Label of the cache slot holding this document.
    const CACHE_LABEL: &'static str;

    fn header(&self) -> &FeedHeader;

    fn header_mut(&mut self) -> &mut FeedHeader;

    /// Document-specific post-processing. The default does nothing.
    fn annotate(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Normalize the header and run [`FeedDocument::annotate`].
    fn prepare(&mut self) -> Result<(), String> {
        self.header_mut().normalize().map_err(|e| e.to_string())?;
        self.annotate()
    }
}

/// A document reachable through the auto-discovery feed under a fixed name.
pub trait ChildFeed: FeedDocument {
    /// Name of the feed in the auto-discovery `feeds` list.
    const FEED_NAME: &'static str;
}
