//! GBFS document types.
//!
//! These map directly to the GBFS JSON feeds. Every document flattens a
//! [`FeedHeader`] for the shared `last_updated`/`ttl` fields; optional wire
//! fields use `Option` because publishers omit them rather than sending null.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::document::{ChildFeed, FeedDocument, FeedHeader, epoch_seconds};
use super::error::GbfsError;

/// The root `gbfs.json` document, mapping language codes to child feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoDiscovery {
    #[serde(flatten)]
    pub header: FeedHeader,

    /// Child feeds available per language code.
    pub data: HashMap<String, LanguageFeeds>,
}

/// Child feeds published in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageFeeds {
    #[serde(default)]
    pub feeds: Vec<FeedRef>,
}

/// A named child feed and its URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRef {
    /// Feed topic, e.g. `station_status`.
    pub name: String,
    pub url: String,
}

impl AutoDiscovery {
    /// Language codes advertised by this document.
    pub fn languages(&self) -> BTreeSet<String> {
        self.data.keys().cloned().collect()
    }

    /// Locate the URL of the named child feed for a language.
    ///
    /// If the language lists the same feed name more than once, the last
    /// entry wins.
    pub fn feed_url(&self, language: &str, feed_name: &str) -> Result<&str, GbfsError> {
        let entry = self
            .data
            .get(language)
            .ok_or_else(|| GbfsError::LanguageNotFound(language.to_string()))?;

        entry
            .feeds
            .iter()
            .rev()
            .find(|feed| feed.name == feed_name)
            .map(|feed| feed.url.as_str())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GbfsError::FeedNotFound(feed_name.to_string()))
    }
}

impl FeedDocument for AutoDiscovery {
    const CACHE_LABEL: &'static str = "autodiscovery";

    fn header(&self) -> &FeedHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut FeedHeader {
        &mut self.header
    }

    fn annotate(&mut self) -> Result<(), String> {
        if self.data.keys().any(|language| language.is_empty()) {
            return Err("auto-discovery data contains an empty language code".to_string());
        }
        Ok(())
    }
}

/// The `station_status` feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationStatusFeed {
    #[serde(flatten)]
    pub header: FeedHeader,
    pub data: StationStatusData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationStatusData {
    pub stations: Vec<StationStatus>,
}

/// Current availability at one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationStatus {
    pub station_id: String,

    #[serde(default)]
    pub num_bikes_available: u32,

    pub num_bikes_disabled: Option<u32>,

    #[serde(default)]
    pub num_docks_available: u32,

    pub num_docks_disabled: Option<u32>,

    #[serde(default, deserialize_with = "flag")]
    pub is_installed: bool,

    #[serde(default, deserialize_with = "flag")]
    pub is_renting: bool,

    #[serde(default, deserialize_with = "flag")]
    pub is_returning: bool,

    /// Seconds since the Unix epoch at which the station last reported.
    pub last_reported: u64,

    /// Derived from `last_reported` after decoding.
    #[serde(skip_deserializing)]
    pub last_reported_timestamp: DateTime<Utc>,
}

impl FeedDocument for StationStatusFeed {
    const CACHE_LABEL: &'static str = "station_status";

    fn header(&self) -> &FeedHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut FeedHeader {
        &mut self.header
    }

    fn annotate(&mut self) -> Result<(), String> {
        for station in &mut self.data.stations {
            station.last_reported_timestamp = epoch_seconds("last_reported", station.last_reported)
                .map_err(|e| format!("station {}: {e}", station.station_id))?;
        }
        Ok(())
    }
}

impl ChildFeed for StationStatusFeed {
    const FEED_NAME: &'static str = "station_status";
}

/// The `station_information` feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInformationFeed {
    #[serde(flatten)]
    pub header: FeedHeader,
    pub data: StationInformationData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInformationData {
    pub stations: Vec<StationInformation>,
}

/// Descriptive, mostly static information about one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInformation {
    pub station_id: String,
    pub name: String,
    pub short_name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub address: Option<String>,
    pub cross_street: Option<String>,
    pub region_id: Option<String>,
    pub post_code: Option<String>,

    /// Number of docks, including broken ones.
    pub capacity: Option<u32>,

    /// e.g. `KEY`, `CREDITCARD`, `APPLEPAY`.
    #[serde(default)]
    pub rental_methods: Vec<String>,
}

impl FeedDocument for StationInformationFeed {
    const CACHE_LABEL: &'static str = "station_information";

    fn header(&self) -> &FeedHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut FeedHeader {
        &mut self.header
    }
}

impl ChildFeed for StationInformationFeed {
    const FEED_NAME: &'static str = "station_information";
}

/// Auto-discovery, station status and station information for one language.
///
/// Holds shared handles to the cached documents rather than copies.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteSnapshot {
    pub auto_discovery: Arc<AutoDiscovery>,
    pub station_status: Arc<StationStatusFeed>,
    pub station_information: Arc<StationInformationFeed>,
}

/// Deserialize a GBFS boolean, which 1.0 feeds encode as `0`/`1`.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlagVisitor;

    impl serde::de::Visitor<'_> for FlagVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean or 0/1")
        }

        fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<bool, E> {
            match v {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(E::custom(format!("expected 0 or 1, got {other}"))),
            }
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<bool, E> {
            match u64::try_from(v) {
                Ok(v) => self.visit_u64(v),
                Err(_) => Err(E::custom(format!("expected 0 or 1, got {v}"))),
            }
        }
    }

    deserializer.deserialize_any(FlagVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auto_discovery(json: &str) -> AutoDiscovery {
        let mut doc: AutoDiscovery = serde_json::from_str(json).unwrap();
        doc.prepare().unwrap();
        doc
    }

    const DISCOVERY: &str = r#"{
        "last_updated": 1700000000,
        "ttl": 30,
        "data": {
            "en": {"feeds": [
                {"name": "station_status", "url": "http://x/status_v1"},
                {"name": "station_information", "url": "http://x/info"},
                {"name": "station_status", "url": "http://x/status_v2"},
                {"name": "system_alerts", "url": ""}
            ]},
            "fr": {"feeds": [
                {"name": "station_status", "url": "http://x/fr/status"}
            ]}
        }
    }"#;

    #[test]
    fn last_matching_feed_wins() {
        let doc = auto_discovery(DISCOVERY);
        assert_eq!(doc.feed_url("en", "station_status").unwrap(), "http://x/status_v2");
        assert_eq!(doc.feed_url("en", "station_information").unwrap(), "http://x/info");
        assert_eq!(doc.feed_url("fr", "station_status").unwrap(), "http://x/fr/status");
    }

    #[test]
    fn unknown_language_is_reported() {
        let doc = auto_discovery(DISCOVERY);
        match doc.feed_url("de", "station_status") {
            Err(GbfsError::LanguageNotFound(lang)) => assert_eq!(lang, "de"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_or_empty_feed_is_reported() {
        let doc = auto_discovery(DISCOVERY);
        match doc.feed_url("fr", "station_information") {
            Err(GbfsError::FeedNotFound(name)) => assert_eq!(name, "station_information"),
            other => panic!("unexpected result: {other:?}"),
        }
        match doc.feed_url("en", "system_alerts") {
            Err(GbfsError::FeedNotFound(name)) => assert_eq!(name, "system_alerts"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn languages_lists_data_keys() {
        let doc = auto_discovery(DISCOVERY);
        let languages: Vec<_> = doc.languages().into_iter().collect();
        assert_eq!(languages, vec!["en".to_string(), "fr".to_string()]);
    }

    #[test]
    fn empty_language_code_is_rejected() {
        let mut doc: AutoDiscovery =
            serde_json::from_str(r#"{"last_updated": 1, "ttl": 1, "data": {"": {"feeds": []}}}"#)
                .unwrap();
        assert!(doc.prepare().is_err());
    }

    #[test]
    fn negative_ttl_fails_to_decode() {
        let result: Result<AutoDiscovery, _> =
            serde_json::from_str(r#"{"last_updated": 1, "ttl": -5, "data": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn station_status_is_annotated() {
        let json = r#"{
            "last_updated": 2000,
            "ttl": 60,
            "data": {"stations": [
                {"station_id": "72", "num_bikes_available": 3, "num_docks_available": 20,
                 "is_installed": true, "is_renting": true, "is_returning": true,
                 "last_reported": 1000}
            ]}
        }"#;
        let mut doc: StationStatusFeed = serde_json::from_str(json).unwrap();
        doc.prepare().unwrap();

        assert_eq!(doc.header.last_updated_timestamp.timestamp(), 2000);
        assert_eq!(doc.header.ttl_duration, std::time::Duration::from_secs(60));
        assert_eq!(doc.data.stations[0].last_reported_timestamp.timestamp(), 1000);
    }

    #[test]
    fn integer_flags_decode() {
        let json = r#"{"station_id": "1", "is_installed": 1, "is_renting": 0,
                       "is_returning": true, "last_reported": 5}"#;
        let station: StationStatus = serde_json::from_str(json).unwrap();
        assert!(station.is_installed);
        assert!(!station.is_renting);
        assert!(station.is_returning);
        assert_eq!(station.num_bikes_available, 0);
    }

    #[test]
    fn out_of_range_flag_is_rejected() {
        let json = r#"{"station_id": "1", "is_installed": 2, "last_reported": 5}"#;
        assert!(serde_json::from_str::<StationStatus>(json).is_err());
    }

    #[test]
    fn station_information_decodes_optional_fields() {
        let json = r#"{
            "last_updated": 10,
            "ttl": 0,
            "data": {"stations": [
                {"station_id": "72", "name": "W 52 St & 11 Ave", "lat": 40.767, "lon": -73.993,
                 "capacity": 39, "rental_methods": ["KEY", "CREDITCARD"]},
                {"station_id": "79", "name": "Franklin St", "lat": 40.719, "lon": -74.006}
            ]}
        }"#;
        let mut doc: StationInformationFeed = serde_json::from_str(json).unwrap();
        doc.prepare().unwrap();

        assert_eq!(doc.data.stations.len(), 2);
        assert_eq!(doc.data.stations[0].capacity, Some(39));
        assert_eq!(doc.data.stations[0].rental_methods, vec!["KEY", "CREDITCARD"]);
        assert!(doc.data.stations[1].short_name.is_none());
        assert!(doc.data.stations[1].rental_methods.is_empty());
        assert_eq!(doc.header.ttl_duration, std::time::Duration::ZERO);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn feed_refs() -> impl Strategy<Value = Vec<FeedRef>> {
        proptest::collection::vec(
            ("[a-c]", "http://x/[a-z]{1,6}").prop_map(|(name, url)| FeedRef { name, url }),
            0..12,
        )
    }

    proptest! {
        /// Resolving a present name returns the URL of the last matching entry
        #[test]
        fn last_match_wins(feeds in feed_refs(), name in "[a-c]") {
            let doc = AutoDiscovery {
                header: FeedHeader::new(0, 0).unwrap(),
                data: HashMap::from([("en".to_string(), LanguageFeeds { feeds: feeds.clone() })]),
            };

            let expected = feeds.iter().filter(|f| f.name == name).last().map(|f| f.url.as_str());
            match (doc.feed_url("en", &name), expected) {
                (Ok(url), Some(expected)) => prop_assert_eq!(url, expected),
                (Err(GbfsError::FeedNotFound(n)), None) => prop_assert_eq!(n, name),
                (result, expected) => prop_assert!(false, "got {:?}, expected {:?}", result, expected),
            }
        }

        /// Absent languages always fail naming the language
        #[test]
        fn absent_language_fails(feeds in feed_refs(), language in "[a-z]{2}") {
            prop_assume!(language != "en");
            let doc = AutoDiscovery {
                header: FeedHeader::new(0, 0).unwrap(),
                data: HashMap::from([("en".to_string(), LanguageFeeds { feeds })]),
            };
            match doc.feed_url(&language, "a") {
                Err(GbfsError::LanguageNotFound(l)) => prop_assert_eq!(l, language),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }
    }
}
