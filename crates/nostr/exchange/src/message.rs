//! NIP-01 frames exchanged with relays.
//!
//! The pool sends `EVENT`, `REQ` and `CLOSE` and understands `EVENT`, `OK`,
//! `EOSE`, `CLOSED` and `NOTICE` coming back. Anything else a relay sends is
//! reported as [`MessageError::UnknownType`] and skipped by the caller.

use nostr::Event;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Errors that can occur when encoding or parsing frames.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Frames the exchange sends to a relay.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    /// `["EVENT", <event>]`
    Event(Event),

    /// `["REQ", <subscription_id>, <filter>...]`
    Req {
        subscription_id: String,
        filters: Vec<Filter>,
    },

    /// `["CLOSE", <subscription_id>]`
    Close { subscription_id: String },
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, MessageError> {
        let frame = match self {
            ClientMessage::Event(event) => json!(["EVENT", event]),
            ClientMessage::Req {
                subscription_id,
                filters,
            } => {
                let mut frame = vec![json!("REQ"), json!(subscription_id)];
                for filter in filters {
                    frame.push(serde_json::to_value(filter)?);
                }
                Value::Array(frame)
            }
            ClientMessage::Close { subscription_id } => json!(["CLOSE", subscription_id]),
        };
        Ok(serde_json::to_string(&frame)?)
    }
}

/// Frames a relay sends back.
#[derive(Debug, Clone)]
pub enum RelayMessage {
    /// `["EVENT", <subscription_id>, <event>]`
    Event {
        subscription_id: String,
        event: Event,
    },

    /// `["OK", <event_id>, <accepted>, <message>?]`
    Ok {
        event_id: String,
        success: bool,
        message: String,
    },

    /// `["EOSE", <subscription_id>]`
    Eose { subscription_id: String },

    /// `["CLOSED", <subscription_id>, <message>?]`
    Closed {
        subscription_id: String,
        message: String,
    },

    /// `["NOTICE", <message>]`
    Notice { message: String },
}

impl RelayMessage {
    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        let frame = Frame::parse(json)?;

        match frame.label.as_str() {
            "EVENT" => Ok(RelayMessage::Event {
                subscription_id: frame.text(1)?,
                event: frame.event(2)?,
            }),
            "OK" => Ok(RelayMessage::Ok {
                event_id: frame.text(1)?,
                success: frame.flag(2)?,
                message: frame.text_or_empty(3),
            }),
            "EOSE" => Ok(RelayMessage::Eose {
                subscription_id: frame.text(1)?,
            }),
            "CLOSED" => Ok(RelayMessage::Closed {
                subscription_id: frame.text(1)?,
                message: frame.text_or_empty(2),
            }),
            "NOTICE" => Ok(RelayMessage::Notice {
                message: frame.text(1)?,
            }),
            other => Err(MessageError::UnknownType(other.to_string())),
        }
    }
}

/// A parsed JSON array with a string label in slot 0.
struct Frame {
    label: String,
    slots: Vec<Value>,
}

impl Frame {
    fn parse(json: &str) -> Result<Self, MessageError> {
        let slots: Vec<Value> =
            serde_json::from_str(json).map_err(|e| MessageError::Malformed(e.to_string()))?;
        let label = slots
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| MessageError::Malformed("missing type label".to_string()))?
            .to_string();
        Ok(Self { label, slots })
    }

    fn slot(&self, index: usize) -> Result<&Value, MessageError> {
        self.slots.get(index).ok_or_else(|| {
            MessageError::Malformed(format!("{} frame has no slot {}", self.label, index))
        })
    }

    fn text(&self, index: usize) -> Result<String, MessageError> {
        self.slot(index)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                MessageError::Malformed(format!("{} slot {} is not a string", self.label, index))
            })
    }

    /// Optional trailing message; absent or non-string is empty.
    fn text_or_empty(&self, index: usize) -> String {
        self.text(index).unwrap_or_default()
    }

    fn flag(&self, index: usize) -> Result<bool, MessageError> {
        self.slot(index)?.as_bool().ok_or_else(|| {
            MessageError::Malformed(format!("{} slot {} is not a boolean", self.label, index))
        })
    }

    fn event(&self, index: usize) -> Result<Event, MessageError> {
        Ok(Event::deserialize(self.slot(index)?)?)
    }
}

/// Subscription filter.
///
/// Only the constraints the exchange issues: metadata/contacts kinds, an
/// author set and a result limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<u16>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.authors = Some(authors);
        self
    }

    pub fn kinds(mut self, kinds: Vec<u16>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Whether `event` satisfies the kind and author constraints.
    ///
    /// `limit` is a relay-side bound and is not checked here.
    pub fn matches(&self, event: &Event) -> bool {
        let kind_ok = self
            .kinds
            .as_ref()
            .is_none_or(|kinds| kinds.contains(&event.kind));
        let author_ok = self
            .authors
            .as_ref()
            .is_none_or(|authors| authors.contains(&event.pubkey));
        kind_ok && author_ok
    }
}
