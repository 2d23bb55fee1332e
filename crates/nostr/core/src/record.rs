//! Typed view over received events.
//!
//! [`Record::from_event`] is the single place an untyped event becomes
//! application data. Kinds this crate does not understand are carried through
//! untouched; their content and tags are never read.

use crate::nip01::{Event, KIND_CONTACTS, KIND_METADATA};
use crate::nip02::{Contact, decode_contacts};
use crate::profile::{ProfileMetadata, extract_role};

/// An event classified by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Kind 0. `profile` is `None` when the content failed to decode.
    Metadata {
        event: Event,
        profile: Option<ProfileMetadata>,
        role: Option<String>,
    },
    /// Kind 3, entries in tag order.
    Contacts { event: Event, contacts: Vec<Contact> },
    /// Any other kind.
    Unrecognized(Event),
}

impl Record {
    /// Classify and decode an event.
    pub fn from_event(event: Event) -> Self {
        match event.kind {
            KIND_METADATA => {
                let profile = ProfileMetadata::decode(&event.content);
                let role = extract_role(&event.tags);
                Record::Metadata {
                    event,
                    profile,
                    role,
                }
            }
            KIND_CONTACTS => {
                let contacts = decode_contacts(&event.tags);
                Record::Contacts { event, contacts }
            }
            _ => Record::Unrecognized(event),
        }
    }

    /// The underlying event.
    pub fn event(&self) -> &Event {
        match self {
            Record::Metadata { event, .. } => event,
            Record::Contacts { event, .. } => event,
            Record::Unrecognized(event) => event,
        }
    }

    /// Author of the underlying event.
    pub fn author(&self) -> &str {
        &self.event().pubkey
    }
}
