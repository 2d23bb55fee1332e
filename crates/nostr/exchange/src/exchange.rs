//! Relay exchange engine.
//!
//! [`RelayExchange`] turns profile and membership intents into bounded,
//! rate-limited relay traffic and turns relay output into typed data:
//!
//! | Operation                  | Filter                         | Deadline                    | Result on timeout / error |
//! |----------------------------|--------------------------------|-----------------------------|---------------------------|
//! | `fetch_profile`            | kind 0, author, limit 1        | `profile_timeout`           | `None`                    |
//! | `fetch_profile_role_tag`   | kind 0, author, limit 1        | `role_timeout`              | `None`                    |
//! | `fetch_follow_list`        | kind 3, author, limit 1        | `follow_list_timeout`       | empty                     |
//! | `fetch_multiple_profiles`  | kind 0, authors                | `multiple_profiles_timeout` | collected / empty         |
//! | `query_profiles`           | kind 0, authors?, limit        | `query_profiles_timeout`    | collected / empty         |
//! | `publish_event`            | -                              | caller or `publish_timeout` | `false` / `Err`           |
//!
//! Reads never surface transport failures or timeouts. The only error a read
//! returns is [`ExchangeError::NotInitialized`].

use crate::config::ExchangeConfig;
use crate::error::{ExchangeError, Result};
use crate::message::Filter;
use crate::race::{Settlement, race};
use crate::rate_limit::RateLimiter;
use crate::source::{EventSigner, EventSource};
use nostr::{
    Contact, ContactList, Event, KIND_CONTACTS, KIND_METADATA, ProfileMetadata, Record,
    UnsignedEvent, is_valid_pubkey, is_valid_relay_url, metadata_event, supersedes,
};
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Rate limiter action for profile fetches.
pub const ACTION_FETCH_PROFILE: &str = "fetch-profile";

/// Rate limiter action for publishes.
pub const ACTION_PUBLISH: &str = "publish";

/// Query/publish/dedup engine over an [`EventSource`].
pub struct RelayExchange {
    config: ExchangeConfig,
    source: RwLock<Option<Arc<dyn EventSource>>>,
    relays: RwLock<Vec<String>>,
    rate_limiter: RateLimiter,
}

impl RelayExchange {
    /// Create an engine with no source attached.
    ///
    /// The initial relay set comes from `config.relays` and must be valid.
    pub fn new(config: ExchangeConfig) -> Result<Self> {
        config.validate()?;
        let relays = config.relays.clone();
        Ok(Self {
            config,
            source: RwLock::new(None),
            relays: RwLock::new(relays),
            rate_limiter: RateLimiter::new(),
        })
    }

    /// Create an engine with `source` already attached.
    pub fn with_source(config: ExchangeConfig, source: Arc<dyn EventSource>) -> Result<Self> {
        let mut exchange = Self::new(config)?;
        *exchange.source.get_mut() = Some(source);
        Ok(exchange)
    }

    /// Attach (or replace) the underlying event source.
    pub async fn attach(&self, source: Arc<dyn EventSource>) {
        *self.source.write().await = Some(source);
        info!("Event source attached");
    }

    /// Engine configuration.
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Replace the relay set.
    ///
    /// All-or-nothing: if any URL fails [`is_valid_relay_url`] nothing changes.
    pub async fn set_relays(&self, urls: Vec<String>) -> Result<()> {
        if let Some(bad) = urls.iter().find(|url| !is_valid_relay_url(url)) {
            warn!("Rejecting relay set containing {}", bad);
            return Err(ExchangeError::InvalidRelayUrl(bad.clone()));
        }

        info!("Relay set updated: {} relays", urls.len());
        *self.relays.write().await = urls;
        Ok(())
    }

    /// Current relay set, in configured order.
    pub async fn relays(&self) -> Vec<String> {
        self.relays.read().await.clone()
    }

    async fn source(&self) -> Result<Arc<dyn EventSource>> {
        self.source
            .read()
            .await
            .clone()
            .ok_or(ExchangeError::NotInitialized)
    }

    /// Fetch the profile metadata of `pubkey`.
    ///
    /// Settles with the first kind 0 event whose content decodes. Returns
    /// `None` on timeout, source error, or when nothing decodes.
    pub async fn fetch_profile(&self, pubkey: &str) -> Result<Option<ProfileMetadata>> {
        let source = self.source().await?;
        if !is_valid_pubkey(pubkey) {
            debug!("Skipping profile fetch for malformed pubkey {}", pubkey);
            return Ok(None);
        }

        self.rate_limiter
            .enforce(ACTION_FETCH_PROFILE, self.config.fetch_profile_interval())
            .await;

        let filter = single_author(KIND_METADATA, pubkey);
        let stream = source.query(&self.relays().await, filter);

        let deadline = self.config.profile_timeout();
        let settlement = race("fetch_profile", stream, deadline, |event| {
            match Record::from_event(event) {
                Record::Metadata {
                    profile: Some(profile),
                    ..
                } => ControlFlow::Break(profile),
                _ => ControlFlow::Continue(()),
            }
        })
        .await;

        Ok(read_outcome("fetch_profile", settlement))
    }

    /// Fetch the role annotation on the metadata event of `pubkey`.
    ///
    /// The first kind 0 event is authoritative; if it carries no valid role
    /// the result is `None`.
    pub async fn fetch_profile_role_tag(&self, pubkey: &str) -> Result<Option<String>> {
        let source = self.source().await?;
        if !is_valid_pubkey(pubkey) {
            debug!("Skipping role fetch for malformed pubkey {}", pubkey);
            return Ok(None);
        }

        let filter = single_author(KIND_METADATA, pubkey);
        let stream = source.query(&self.relays().await, filter);

        let deadline = self.config.role_timeout();
        let settlement = race("fetch_profile_role_tag", stream, deadline, |event| {
            match Record::from_event(event) {
                Record::Metadata { role, .. } => ControlFlow::Break(role),
                _ => ControlFlow::Continue(()),
            }
        })
        .await;

        Ok(read_outcome("fetch_profile_role_tag", settlement).flatten())
    }

    /// Fetch the follow/membership list of `pubkey`, in tag order.
    ///
    /// Never `None`: a missing list, timeout or source error is an empty list.
    pub async fn fetch_follow_list(&self, pubkey: &str) -> Result<Vec<Contact>> {
        let source = self.source().await?;
        if !is_valid_pubkey(pubkey) {
            debug!("Skipping follow list fetch for malformed pubkey {}", pubkey);
            return Ok(Vec::new());
        }

        let filter = single_author(KIND_CONTACTS, pubkey);
        let stream = source.query(&self.relays().await, filter);

        let deadline = self.config.follow_list_timeout();
        let settlement = race("fetch_follow_list", stream, deadline, |event| {
            match Record::from_event(event) {
                Record::Contacts { contacts, .. } => ControlFlow::Break(contacts),
                _ => ControlFlow::Continue(()),
            }
        })
        .await;

        Ok(read_outcome("fetch_follow_list", settlement).unwrap_or_default())
    }

    /// Fetch profiles for several authors at once.
    ///
    /// Every decodable kind 0 event seen before the deadline is kept, keyed by
    /// author. When an author has several, the last one delivered wins
    /// regardless of `created_at`. Unlike [`Self::query_profiles`], no
    /// latest-wins ordering is applied.
    pub async fn fetch_multiple_profiles(
        &self,
        pubkeys: &[String],
    ) -> Result<HashMap<String, ProfileMetadata>> {
        if pubkeys.is_empty() {
            return Ok(HashMap::new());
        }
        let source = self.source().await?;

        let filter = Filter::new()
            .kinds(vec![KIND_METADATA])
            .authors(pubkeys.to_vec());
        let stream = source.query(&self.relays().await, filter);

        let mut profiles = HashMap::new();
        let settlement: Settlement<()> = race(
            "fetch_multiple_profiles",
            stream,
            self.config.multiple_profiles_timeout(),
            |event| {
                if let Record::Metadata {
                    event,
                    profile: Some(profile),
                    ..
                } = Record::from_event(event)
                {
                    profiles.insert(event.pubkey, profile);
                }
                ControlFlow::Continue(())
            },
        )
        .await;

        Ok(collected_outcome("fetch_multiple_profiles", settlement, profiles))
    }

    /// Query profiles with latest-wins per author.
    ///
    /// With no authors this is discovery: the most recent `limit` metadata
    /// events from anyone. For each author only the decodable event with the
    /// greatest `created_at` survives; ties keep the first seen.
    pub async fn query_profiles(
        &self,
        pubkeys: Option<&[String]>,
        limit: Option<u64>,
    ) -> Result<HashMap<String, ProfileMetadata>> {
        let source = self.source().await?;
        let limit = limit.unwrap_or(self.config.query_limit);

        let mut filter = Filter::new().kinds(vec![KIND_METADATA]).limit(limit);
        if let Some(pubkeys) = pubkeys.filter(|keys| !keys.is_empty()) {
            filter = filter.authors(pubkeys.to_vec());
        }
        let stream = source.query(&self.relays().await, filter);

        let mut latest: HashMap<String, (Event, ProfileMetadata)> = HashMap::new();
        let settlement: Settlement<()> = race(
            "query_profiles",
            stream,
            self.config.query_profiles_timeout(),
            |event| {
                if let Record::Metadata {
                    event,
                    profile: Some(profile),
                    ..
                } = Record::from_event(event)
                {
                    let newer = latest
                        .get(&event.pubkey)
                        .is_none_or(|(current, _)| supersedes(&event, current));
                    if newer {
                        latest.insert(event.pubkey.clone(), (event, profile));
                    }
                }
                ControlFlow::Continue(())
            },
        )
        .await;

        let profiles = latest
            .into_iter()
            .map(|(author, (_, profile))| (author, profile))
            .collect();
        Ok(collected_outcome("query_profiles", settlement, profiles))
    }

    /// Publish a signed event and wait for a relay to accept it.
    ///
    /// `Ok(true)` only on an explicit acceptance before the deadline;
    /// `Ok(false)` on timeout, rejection by every answering relay, or
    /// completion without acceptance. Transport failure is an error.
    pub async fn publish_event(&self, event: Event, timeout: Option<Duration>) -> Result<bool> {
        let source = self.source().await?;
        let relays = self.relays().await;
        if relays.is_empty() {
            return Err(ExchangeError::NoRelays);
        }

        self.rate_limiter
            .enforce(ACTION_PUBLISH, self.config.publish_interval())
            .await;

        let event_id = event.id.clone();
        let deadline = timeout.unwrap_or_else(|| self.config.publish_timeout());
        let stream = source.publish(&relays, event);

        let settlement = race("publish_event", stream, deadline, |confirmation| {
            if confirmation.accepted {
                ControlFlow::Break(confirmation.relay_url)
            } else {
                debug!(
                    "Relay {} rejected {}: {}",
                    confirmation.relay_url, confirmation.event_id, confirmation.message
                );
                ControlFlow::Continue(())
            }
        })
        .await;

        match settlement {
            Settlement::Matched(relay_url) => {
                info!("Event {} accepted by {}", event_id, relay_url);
                Ok(true)
            }
            Settlement::Completed => {
                warn!("Event {} not accepted by any relay", event_id);
                Ok(false)
            }
            Settlement::TimedOut => {
                warn!("Event {} unacknowledged after {:?}", event_id, deadline);
                Ok(false)
            }
            Settlement::Failed(e) => Err(ExchangeError::Transport(e)),
        }
    }

    /// Replace the follow/membership list of `pubkey` with `contacts`.
    ///
    /// Every entry is validated before the signer is called; a malformed
    /// pubkey or relay URL fails without any network traffic.
    pub async fn publish_follow_list<S>(
        &self,
        pubkey: &str,
        contacts: &[Contact],
        signer: &S,
    ) -> Result<bool>
    where
        S: EventSigner + ?Sized,
    {
        let unsigned = ContactList::unsigned_event(pubkey, contacts)?;
        debug!("Publishing follow list for {} with {} entries", pubkey, contacts.len());
        self.sign_and_publish(unsigned, signer).await
    }

    /// Publish profile metadata for `pubkey`, optionally annotated with a role.
    ///
    /// Free-text fields are sanitized on encode. An invalid role fails before
    /// the signer is called.
    pub async fn publish_profile<S>(
        &self,
        pubkey: &str,
        profile: &ProfileMetadata,
        role: Option<&str>,
        signer: &S,
    ) -> Result<bool>
    where
        S: EventSigner + ?Sized,
    {
        let unsigned = metadata_event(pubkey, profile, role)?;
        debug!("Publishing profile for {}", pubkey);
        self.sign_and_publish(unsigned, signer).await
    }

    async fn sign_and_publish<S>(&self, unsigned: UnsignedEvent, signer: &S) -> Result<bool>
    where
        S: EventSigner + ?Sized,
    {
        // Fail before signing when there is nowhere to send the event.
        self.source().await?;
        if self.relays.read().await.is_empty() {
            return Err(ExchangeError::NoRelays);
        }

        let event = signer.sign(unsigned).await?;
        self.publish_event(event, None).await
    }
}

fn single_author(kind: u16, pubkey: &str) -> Filter {
    Filter::new()
        .kinds(vec![kind])
        .authors(vec![pubkey.to_string()])
        .limit(1)
}

/// Collapse a single-value read to its value, swallowing failures.
fn read_outcome<T>(label: &str, settlement: Settlement<T>) -> Option<T> {
    match settlement {
        Settlement::Matched(value) => Some(value),
        Settlement::Completed | Settlement::TimedOut => None,
        Settlement::Failed(e) => {
            warn!("{} degraded to empty after source error: {}", label, e);
            None
        }
    }
}

/// Keep what a collecting read gathered unless the source failed.
fn collected_outcome<K, V>(
    label: &str,
    settlement: Settlement<()>,
    collected: HashMap<K, V>,
) -> HashMap<K, V> {
    match settlement {
        Settlement::Failed(e) => {
            warn!("{} degraded to empty after source error: {}", label, e);
            HashMap::new()
        }
        _ => collected,
    }
}
