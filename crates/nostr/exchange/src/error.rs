//! Exchange error types

use crate::source::{SignError, SourceError};
use nostr::{Nip02Error, ProfileError};
use thiserror::Error;

/// Exchange error type
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// No event source attached yet
    #[error("Event source not initialized")]
    NotInitialized,

    /// A relay URL in a proposed relay set is not ws:// or wss://
    #[error("Invalid relay URL: {0}")]
    InvalidRelayUrl(String),

    /// Publish attempted with an empty relay set
    #[error("No relays configured")]
    NoRelays,

    /// Malformed follow list entry
    #[error("Validation error: {0}")]
    Validation(#[from] Nip02Error),

    /// Malformed profile or role
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// The event source reported a failure while publishing
    #[error("Transport error: {0}")]
    Transport(#[from] SourceError),

    /// The injected signer failed
    #[error("Signing error: {0}")]
    Signing(#[from] SignError),

    /// Invalid configuration file contents
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exchange result type
pub type Result<T> = std::result::Result<T, ExchangeError>;
