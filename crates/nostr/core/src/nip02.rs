//! Relationship lists (NIP-02, kind 3).
//!
//! A list is a set of `["p", <pubkey>, <relay>?, <petname>?]` tags on a
//! kind 3 record. Publishing always replaces the whole list.
//!
//! Decoding is lenient: it keeps every `p` tag in order, duplicates included,
//! and does not check pubkeys. Encoding is the gate: [`encode_contacts`]
//! refuses a list with any malformed pubkey or relay hint.

use crate::nip01::{Event, KIND_CONTACTS, UnsignedEvent};
use crate::validate::{is_valid_pubkey, is_valid_relay_url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event kind of a relationship list.
pub const CONTACT_LIST_KIND: u16 = KIND_CONTACTS;

const P_TAG: &str = "p";

/// Errors raised by the relationship list codec.
#[derive(Debug, Error)]
pub enum Nip02Error {
    #[error("not a relationship list: kind {0}")]
    InvalidKind(u16),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid relay url for {pubkey}: {relay_url}")]
    InvalidRelayUrl { pubkey: String, relay_url: String },
}

/// One entry of a relationship list.
///
/// Empty relay hints and petnames are stored as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub pubkey: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub petname: Option<String>,
}

impl Contact {
    /// Entry with no relay hint or petname.
    pub fn new(pubkey: impl Into<String>) -> Self {
        Self {
            pubkey: pubkey.into(),
            relay_url: None,
            petname: None,
        }
    }

    /// Entry with a relay hint. An empty hint is treated as absent.
    pub fn with_relay(pubkey: impl Into<String>, relay_url: impl Into<String>) -> Self {
        Self::new(pubkey).relay(relay_url)
    }

    /// Entry with a relay hint and a petname. Empty values are treated as absent.
    pub fn with_relay_and_petname(
        pubkey: impl Into<String>,
        relay_url: impl Into<String>,
        petname: impl Into<String>,
    ) -> Self {
        Self::new(pubkey).relay(relay_url).named(petname)
    }

    fn relay(mut self, relay_url: impl Into<String>) -> Self {
        self.relay_url = present(relay_url.into());
        self
    }

    fn named(mut self, petname: impl Into<String>) -> Self {
        self.petname = present(petname.into());
        self
    }

    /// Rejects a malformed pubkey, or a relay hint that is not ws/wss.
    pub fn validate(&self) -> Result<(), Nip02Error> {
        if !is_valid_pubkey(&self.pubkey) {
            return Err(Nip02Error::InvalidPublicKey(self.pubkey.clone()));
        }
        match &self.relay_url {
            Some(url) if !is_valid_relay_url(url) => Err(Nip02Error::InvalidRelayUrl {
                pubkey: self.pubkey.clone(),
                relay_url: url.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Tag form of this entry.
    ///
    /// Trailing absent slots are dropped. A petname without a relay keeps an
    /// empty relay slot so the petname stays at index 3.
    pub fn to_tag(&self) -> Vec<String> {
        let mut tag = vec![P_TAG.to_string(), self.pubkey.clone()];
        if self.relay_url.is_some() || self.petname.is_some() {
            tag.push(self.relay_url.clone().unwrap_or_default());
        }
        if let Some(petname) = &self.petname {
            tag.push(petname.clone());
        }
        tag
    }

    /// Reads a `p` tag. Anything else, or a tag without a pubkey slot, is
    /// `None`. The pubkey is taken as-is.
    pub fn from_tag(tag: &[String]) -> Option<Self> {
        match tag {
            [name, pubkey, rest @ ..] if name == P_TAG => {
                let mut contact = Self::new(pubkey.clone());
                if let Some(relay_url) = rest.first() {
                    contact = contact.relay(relay_url.clone());
                }
                if let Some(petname) = rest.get(1) {
                    contact = contact.named(petname.clone());
                }
                Some(contact)
            }
            _ => None,
        }
    }
}

fn present(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// All `p` tags as entries, in tag order.
pub fn decode_contacts(tags: &[Vec<String>]) -> Vec<Contact> {
    tags.iter()
        .filter_map(|tag| Contact::from_tag(tag))
        .collect()
}

/// Tags for a whole list, or the error of the first invalid entry.
pub fn encode_contacts(contacts: &[Contact]) -> Result<Vec<Vec<String>>, Nip02Error> {
    let mut tags = Vec::with_capacity(contacts.len());
    for contact in contacts {
        contact.validate()?;
        tags.push(contact.to_tag());
    }
    Ok(tags)
}

/// A decoded kind 3 record together with its entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactList {
    pub event: Event,
    pub contacts: Vec<Contact>,
}

impl ContactList {
    /// Decode a kind 3 record. Any other kind is an error.
    pub fn from_event(event: Event) -> Result<Self, Nip02Error> {
        if event.kind != CONTACT_LIST_KIND {
            return Err(Nip02Error::InvalidKind(event.kind));
        }
        let contacts = decode_contacts(&event.tags);
        Ok(Self { event, contacts })
    }

    /// Unsigned replacement list authored by `pubkey`, ready for a signer.
    pub fn unsigned_event(pubkey: &str, contacts: &[Contact]) -> Result<UnsignedEvent, Nip02Error> {
        if !is_valid_pubkey(pubkey) {
            return Err(Nip02Error::InvalidPublicKey(pubkey.to_string()));
        }
        let tags = encode_contacts(contacts)?;
        Ok(UnsignedEvent::new(pubkey, CONTACT_LIST_KIND, tags, ""))
    }

    /// Whether `pubkey` appears in the list.
    pub fn contains(&self, pubkey: &str) -> bool {
        self.contacts.iter().any(|c| c.pubkey == pubkey)
    }

    /// Every listed pubkey, in list order, duplicates included.
    pub fn pubkeys(&self) -> Vec<String> {
        self.contacts.iter().map(|c| c.pubkey.clone()).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}
