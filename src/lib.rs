//! # Trophy Agent Library
//!
//! Fetches trophy (PSN) and collection (Bangumi) data on behalf of a site,
//! managing the short-lived PSN credential, caching mapped responses per
//! endpoint, fanning out per-item lookups with a bounded pool, and shaping
//! loosely typed upstream JSON into stable records.
//!
//! Modules:
//! - `config`: service configuration, validation and the long-lived secret
//! - `cache`: credential store and TTL response caches
//! - `sources`: upstream HTTP clients and the credential lifecycle
//! - `resilience`: bounded-concurrency fan-out
//! - `parser`: defensive normalization of upstream payloads
//! - `aggregate`: request modes composed from the above
//! - `server`: axum HTTP surface

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod parser;
pub mod resilience;
pub mod server;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::sources::*;
