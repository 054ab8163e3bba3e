//! SiteLink Connector Library
//!
//! This crate provides the trust boundary for the SiteLink connector: the
//! authentication, replay-protection, rate-limiting, and capability-gating
//! layer that every inbound request from the manager must pass before any
//! site data is read or any mutating action is performed.

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod keystore;
pub mod protocol;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds.
///
/// The authentication path takes `now` as an explicit parameter; this is
/// the convenience source for callers and background eviction sweeps.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
