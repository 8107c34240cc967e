//! GBFS feed documents and transport.
//!
//! GBFS (General Bikeshare Feed Specification) publishes a system's state as
//! a family of JSON documents:
//! - a root auto-discovery document (`gbfs.json`) lists, per language code,
//!   the URLs of the child feeds
//! - child feeds such as `station_status` and `station_information` carry
//!   the actual data
//! - every document declares `last_updated` (epoch seconds) and `ttl`
//!   (seconds of freshness), which drive caching

mod document;
mod error;
mod mock;
mod transport;
mod types;

pub use document::{ChildFeed, FeedDocument, FeedHeader, TimestampOutOfRange, epoch_seconds};
pub use error::GbfsError;
pub use mock::MockTransport;
pub use transport::{DEFAULT_TIMEOUT_SECS, FeedTransport, HttpTransport, TransportConfig};
pub use types::{
    AutoDiscovery, CompleteSnapshot, FeedRef, LanguageFeeds, StationInformation,
    StationInformationData, StationInformationFeed, StationStatus, StationStatusData,
    StationStatusFeed,
};
