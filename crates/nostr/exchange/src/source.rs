//! Seams to the collaborators the exchange does not own.
//!
//! - [`EventSource`]: the network side. Both operations return a stream that
//!   yields items, then either ends (completion) or yields an `Err` (failure).
//!   Dropping the stream is the unsubscribe.
//! - [`EventSigner`]: turns an [`UnsignedEvent`] into a signed [`Event`]. Any
//!   `Fn(UnsignedEvent) -> impl Future<Output = Result<Event, SignError>>`
//!   closure is a signer.

use crate::message::Filter;
use async_trait::async_trait;
use futures::stream::BoxStream;
use nostr::{Event, UnsignedEvent};
use std::future::Future;
use thiserror::Error;

/// Failure reported by an event source stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Could not reach a relay
    #[error("Connection error: {0}")]
    Connection(String),

    /// WebSocket failure after connecting
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Relay sent something that is not NIP-01
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Failure reported by the injected signer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SignError(pub String);

/// Item stream returned by an [`EventSource`].
pub type SourceStream<T> = BoxStream<'static, Result<T, SourceError>>;

/// Confirmation for a published event from one relay (NIP-01 `OK`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfirmation {
    /// Relay that answered
    pub relay_url: String,
    /// Event ID that was published
    pub event_id: String,
    /// Whether the relay accepted the event
    pub accepted: bool,
    /// Message from the relay (empty if accepted, error message if rejected)
    pub message: String,
}

/// Underlying event store the exchange queries and publishes through.
pub trait EventSource: Send + Sync {
    /// Stream events matching `filter` from `relays`.
    fn query(&self, relays: &[String], filter: Filter) -> SourceStream<Event>;

    /// Send `event` to `relays`, streaming one confirmation per answer.
    fn publish(&self, relays: &[String], event: Event) -> SourceStream<PublishConfirmation>;
}

/// Signs events on behalf of the exchange.
#[async_trait]
pub trait EventSigner: Send + Sync {
    async fn sign(&self, unsigned: UnsignedEvent) -> Result<Event, SignError>;
}

#[async_trait]
impl<F, Fut> EventSigner for F
where
    F: Fn(UnsignedEvent) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Event, SignError>> + Send,
{
    async fn sign(&self, unsigned: UnsignedEvent) -> Result<Event, SignError> {
        (self)(unsigned).await
    }
}
