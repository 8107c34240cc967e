//! Cached client for GBFS bike and scooter share feeds.
//!
//! Discovers child feeds from a system's auto-discovery document, fetches
//! and normalizes station status and station information, and caches each
//! document for the TTL the publisher declares.

pub mod cache;
pub mod client;
pub mod feed;

pub use client::{ClientConfig, GbfsClient};
pub use feed::GbfsError;
