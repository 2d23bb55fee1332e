//! Nostr record types for profile and membership exchange.
//!
//! This crate provides:
//! - NIP-01: Event structure and the metadata/contacts kinds
//! - NIP-02: Follow List (Contact List and Petnames) encode/decode
//! - Profile metadata decoding with a size ceiling and field whitelist
//! - Role annotations on metadata events
//! - Validators for pubkeys, relay URLs, HTTP URLs and role values
//! - A kind-keyed [`Record`] view that turns untrusted events into typed data
//!
//! Everything here is pure; networking lives in `nostr-exchange`.

mod nip01;
mod nip02;
mod profile;
mod record;
mod validate;

// NIP-01: Basic protocol
pub use nip01::{Event, KIND_CONTACTS, KIND_METADATA, UnsignedEvent, supersedes, unix_now};

// NIP-02: Follow List (Contact List and Petnames)
pub use nip02::{
    CONTACT_LIST_KIND, Contact, ContactList, Nip02Error, decode_contacts, encode_contacts,
};

// Profile metadata and role annotations
pub use profile::{
    MAX_METADATA_CONTENT_LEN, ProfileError, ProfileMetadata, ROLE_TAG, extract_role,
    metadata_event, role_tag,
};

// Typed records
pub use record::Record;

// Validators
pub use validate::{
    MAX_DISPLAY_TEXT_LEN, MAX_ROLE_TAG_LEN, is_valid_http_url, is_valid_pubkey,
    is_valid_relay_url, is_valid_role_tag, sanitize_display,
};
