//! Deadline-bounded profile and membership exchange over Nostr relays.
//!
//! This crate provides:
//! - [`RelayExchange`]: reads and publishes of profile metadata, role
//!   annotations and follow/membership lists, each bounded by a deadline
//! - Per-action cooldowns for profile fetches and publishes
//! - Latest-wins deduplication of profile queries
//! - [`RelayPool`]: a WebSocket [`EventSource`] speaking NIP-01
//! - JSON configuration with defaults for every deadline and cooldown
//!
//! # Example
//!
//! ```rust,no_run
//! use nostr_exchange::{ExchangeConfig, RelayExchange, RelayPool};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> nostr_exchange::Result<()> {
//!     let config = ExchangeConfig::default();
//!     let pool = Arc::new(RelayPool::from_config(&config));
//!     let exchange = RelayExchange::with_source(config, pool)?;
//!
//!     let pubkey = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
//!     if let Some(profile) = exchange.fetch_profile(pubkey).await? {
//!         println!("Name: {:?}", profile.name);
//!     }
//!
//!     for contact in exchange.fetch_follow_list(pubkey).await? {
//!         println!("Follows {}", contact.pubkey);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod exchange;
mod message;
mod pool;
mod race;
mod rate_limit;
mod source;

pub use config::{ExchangeConfig, load_config, save_config};
pub use error::{ExchangeError, Result};
pub use exchange::{ACTION_FETCH_PROFILE, ACTION_PUBLISH, RelayExchange};
pub use message::{ClientMessage, Filter, MessageError, RelayMessage};
pub use pool::{RelayPool, generate_subscription_id};
pub use race::{Settlement, race};
pub use rate_limit::RateLimiter;
pub use source::{
    EventSigner, EventSource, PublishConfirmation, SignError, SourceError, SourceStream,
};

/// Relays used when no relay set is configured.
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://relay.nostr.band",
];
