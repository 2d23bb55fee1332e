//! Integration tests for the relay exchange engine
//!
//! Most tests drive [`RelayExchange`] through a scripted in-memory
//! [`EventSource`] under paused time. `relay_pool` runs the real WebSocket
//! pool against a local relay.

pub mod social;

use futures::{Stream, StreamExt, stream};
use nostr::{Event, KIND_CONTACTS, KIND_METADATA, UnsignedEvent};
use nostr_exchange::{
    ExchangeConfig, Filter, PublishConfirmation, RelayExchange, SignError, SourceError,
    SourceStream,
};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::task::{Context, Poll};

pub const RELAY: &str = "wss://relay.test";

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// 64 hex chars built from one repeated digit.
pub fn pubkey(c: char) -> String {
    c.to_string().repeat(64)
}

pub fn metadata(author: &str, created_at: u64, content: &str) -> Event {
    Event {
        id: format!("{}-{}", &author[..8], created_at),
        pubkey: author.to_string(),
        created_at,
        kind: KIND_METADATA,
        tags: vec![],
        content: content.to_string(),
        sig: String::new(),
    }
}

pub fn named(author: &str, created_at: u64, name: &str) -> Event {
    metadata(author, created_at, &format!(r#"{{"name":"{}"}}"#, name))
}

pub fn contacts(author: &str, created_at: u64, tags: Vec<Vec<String>>) -> Event {
    Event {
        id: format!("contacts-{}-{}", &author[..8], created_at),
        pubkey: author.to_string(),
        created_at,
        kind: KIND_CONTACTS,
        tags,
        content: String::new(),
        sig: String::new(),
    }
}

pub fn confirmation(relay_url: &str, event_id: &str, accepted: bool) -> PublishConfirmation {
    PublishConfirmation {
        relay_url: relay_url.to_string(),
        event_id: event_id.to_string(),
        accepted,
        message: if accepted {
            String::new()
        } else {
            "blocked: test".to_string()
        },
    }
}

/// How a scripted stream ends after its items.
#[derive(Debug, Clone)]
pub enum Tail {
    Complete,
    Hang,
    Fail(SourceError),
}

/// Scripted [`EventSource`] that replays fixed items and records traffic.
pub struct ScriptedSource {
    events: Vec<Event>,
    query_tail: Tail,
    confirmations: Vec<PublishConfirmation>,
    publish_tail: Tail,
    pub queries: Mutex<Vec<(Vec<String>, Filter)>>,
    pub published: Mutex<Vec<Event>>,
    pub dropped: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            query_tail: Tail::Complete,
            confirmations: Vec::new(),
            publish_tail: Tail::Complete,
            queries: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Events delivered (in order) to every query whose filter they match.
    pub fn events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    pub fn query_tail(mut self, tail: Tail) -> Self {
        self.query_tail = tail;
        self
    }

    pub fn confirmations(mut self, confirmations: Vec<PublishConfirmation>) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn publish_tail(mut self, tail: Tail) -> Self {
        self.publish_tail = tail;
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn last_filter(&self) -> Option<Filter> {
        self.queries.lock().unwrap().last().map(|(_, f)| f.clone())
    }

    pub fn published(&self) -> Vec<Event> {
        self.published.lock().unwrap().clone()
    }

    pub fn drop_count(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    fn script<T: Send + 'static>(&self, items: Vec<T>, tail: &Tail) -> SourceStream<T> {
        let head = stream::iter(items.into_iter().map(Ok));
        let tail: SourceStream<T> = match tail.clone() {
            Tail::Complete => stream::empty().boxed(),
            Tail::Hang => stream::pending().boxed(),
            Tail::Fail(e) => stream::once(async move { Err(e) }).boxed(),
        };
        DropCounter {
            inner: head.chain(tail).boxed(),
            dropped: Arc::clone(&self.dropped),
        }
        .boxed()
    }
}

impl nostr_exchange::EventSource for ScriptedSource {
    fn query(&self, relays: &[String], filter: Filter) -> SourceStream<Event> {
        let matching: Vec<Event> = self
            .events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        self.queries
            .lock()
            .unwrap()
            .push((relays.to_vec(), filter));
        self.script(matching, &self.query_tail)
    }

    fn publish(&self, _relays: &[String], event: Event) -> SourceStream<PublishConfirmation> {
        self.published.lock().unwrap().push(event);
        self.script(self.confirmations.clone(), &self.publish_tail)
    }
}

struct DropCounter<T> {
    inner: SourceStream<T>,
    dropped: Arc<AtomicUsize>,
}

impl<T> Stream for DropCounter<T> {
    type Item = Result<T, SourceError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl<T> Drop for DropCounter<T> {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn test_config() -> ExchangeConfig {
    ExchangeConfig::with_relays(vec![RELAY.to_string()])
}

pub fn exchange_with(source: Arc<ScriptedSource>) -> RelayExchange {
    init_tracing();
    RelayExchange::with_source(test_config(), source).unwrap()
}

pub fn exchange_with_config(config: ExchangeConfig, source: Arc<ScriptedSource>) -> RelayExchange {
    init_tracing();
    RelayExchange::with_source(config, source).unwrap()
}

/// Signer that stamps a fake id and counts invocations.
pub struct CountingSigner {
    pub calls: AtomicUsize,
}

impl CountingSigner {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl nostr_exchange::EventSigner for CountingSigner {
    async fn sign(&self, unsigned: UnsignedEvent) -> Result<Event, SignError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Event {
            id: format!("signed-{}", n),
            pubkey: unsigned.pubkey,
            created_at: unsigned.created_at,
            kind: unsigned.kind,
            tags: unsigned.tags,
            content: unsigned.content,
            sig: "f".repeat(128),
        })
    }
}

/// Assert a paused-clock duration within timer granularity.
pub fn assert_near(actual: std::time::Duration, expected: std::time::Duration) {
    assert!(
        actual >= expected && actual <= expected + std::time::Duration::from_millis(5),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}
