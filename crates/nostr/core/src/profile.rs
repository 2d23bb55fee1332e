//! Profile metadata carried by kind 0 events.
//!
//! The content of a metadata event is a JSON object written by whoever owns
//! the key, so decoding is a strict boundary: oversized payloads are refused
//! before parsing, only a fixed set of string fields survive, and every
//! failure collapses to `None`.
//!
//! Metadata events may also carry a `["role", <value>]` annotation. The first
//! role tag whose value passes [`is_valid_role_tag`] is authoritative.

use crate::nip01::{KIND_METADATA, UnsignedEvent};
use crate::validate::{is_valid_pubkey, is_valid_role_tag, sanitize_display};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Largest metadata content accepted by [`ProfileMetadata::decode`], in
/// UTF-16 code units (the length JavaScript clients report).
pub const MAX_METADATA_CONTENT_LEN: usize = 10_000;

/// Tag name for role annotations on metadata events.
pub const ROLE_TAG: &str = "role";

/// Errors that can occur when building a metadata event.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid role tag: {0:?}")]
    InvalidRole(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Decoded profile metadata.
///
/// Only the whitelisted fields exist; anything else in the source object is
/// dropped on decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl ProfileMetadata {
    /// Decode the content of a metadata event.
    ///
    /// Returns `None` when the content is longer than
    /// [`MAX_METADATA_CONTENT_LEN`], is not valid JSON, or is not an object.
    /// Whitelisted fields that are not strings are dropped silently.
    pub fn decode(content: &str) -> Option<Self> {
        if content.encode_utf16().count() > MAX_METADATA_CONTENT_LEN {
            return None;
        }

        let value: Value = serde_json::from_str(content).ok()?;
        let object = value.as_object()?;

        let field = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Some(Self {
            name: field("name"),
            display_name: field("display_name"),
            about: field("about"),
            picture: field("picture"),
            website: field("website"),
        })
    }

    /// Encode for publishing.
    ///
    /// `name`, `display_name` and `about` are re-sanitized; URL fields pass
    /// through untouched since they are validated at render time.
    pub fn encode(&self) -> Result<String, ProfileError> {
        let outgoing = Self {
            name: self.name.as_deref().map(sanitize_display),
            display_name: self.display_name.as_deref().map(sanitize_display),
            about: self.about.as_deref().map(sanitize_display),
            picture: self.picture.clone(),
            website: self.website.clone(),
        };
        Ok(serde_json::to_string(&outgoing)?)
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.display_name.is_none()
            && self.about.is_none()
            && self.picture.is_none()
            && self.website.is_none()
    }
}

/// Find the authoritative role in a metadata event's tags.
///
/// Scans for `["role", value, ..]` tags in order and returns the first trimmed
/// value that passes [`is_valid_role_tag`]. Invalid values are skipped rather
/// than ending the scan.
pub fn extract_role(tags: &[Vec<String>]) -> Option<String> {
    tags.iter()
        .filter(|tag| tag.first().map(String::as_str) == Some(ROLE_TAG))
        .filter_map(|tag| tag.get(1))
        .map(|value| value.trim())
        .find(|value| is_valid_role_tag(value))
        .map(str::to_string)
}

/// Build the `["role", value]` tag, rejecting values that would not survive
/// [`extract_role`] on the way back.
pub fn role_tag(role: &str) -> Result<Vec<String>, ProfileError> {
    if !is_valid_role_tag(role) {
        return Err(ProfileError::InvalidRole(role.to_string()));
    }
    Ok(vec![ROLE_TAG.to_string(), role.trim().to_string()])
}

/// Build an unsigned kind 0 event for `pubkey` with an optional role.
pub fn metadata_event(
    pubkey: &str,
    profile: &ProfileMetadata,
    role: Option<&str>,
) -> Result<UnsignedEvent, ProfileError> {
    if !is_valid_pubkey(pubkey) {
        return Err(ProfileError::InvalidPublicKey(pubkey.to_string()));
    }

    let tags = match role {
        Some(role) => vec![role_tag(role)?],
        None => Vec::new(),
    };

    Ok(UnsignedEvent::new(
        pubkey,
        KIND_METADATA,
        tags,
        profile.encode()?,
    ))
}
