//! Wire record shared by every read and write.
//!
//! Only two kinds are interpreted: profile metadata (0) and relationship
//! lists (3). Hashing and signing happen outside this crate; [`UnsignedEvent`]
//! is what a signer receives and [`Event`] is what it hands back.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A record as relays store and deliver it.
///
/// The signer-produced fields (`id`, `pubkey`, `sig`) are opaque here and
/// default to empty so partially-formed records still parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: String,
    /// Author key, 64 hex characters.
    #[serde(default)]
    pub pubkey: String,
    /// Seconds since the unix epoch; orders replaceable records.
    pub created_at: u64,
    pub kind: u16,
    #[serde(default)]
    pub tags: Vec<Vec<String>>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sig: String,
}

/// Record body awaiting a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

impl UnsignedEvent {
    /// Build an unsigned event stamped with the current time.
    pub fn new(
        pubkey: impl Into<String>,
        kind: u16,
        tags: Vec<Vec<String>>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            pubkey: pubkey.into(),
            created_at: unix_now(),
            kind,
            tags,
            content: content.into(),
        }
    }
}

/// Profile metadata record.
pub const KIND_METADATA: u16 = 0;
/// Relationship (follow/member) list record.
pub const KIND_CONTACTS: u16 = 3;

/// Current time in unix seconds.
///
/// A clock set before the epoch yields `0` rather than failing.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Whether `candidate` supersedes `current` under latest-wins ordering.
///
/// Only a strictly greater `created_at` wins; ties keep the record seen first.
pub fn supersedes(candidate: &Event, current: &Event) -> bool {
    candidate.created_at > current.created_at
}
