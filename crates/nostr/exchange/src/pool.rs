//! WebSocket relay pool.
//!
//! [`RelayPool`] is the production [`EventSource`]. Every query or publish
//! opens one short-lived connection per relay and fans the results into a
//! single stream:
//! - `query` sends `REQ`, forwards matching `EVENT`s (de-duplicated by id
//!   across relays) and finishes a relay at `EOSE` or `CLOSED`
//! - `publish` sends `EVENT` and forwards the relay's `OK`
//!
//! The merged stream ends once every relay is done. It yields an error only
//! when every relay failed. Dropping the stream sends `CLOSE` and tears down
//! the remaining connections.

use crate::config::ExchangeConfig;
use crate::message::{ClientMessage, Filter, RelayMessage};
use crate::source::{EventSource, PublishConfirmation, SourceError, SourceStream};
use futures::{SinkExt, StreamExt, stream};
use nostr::Event;
use std::collections::HashSet;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Per-relay channel capacity.
const CHANNEL_CAPACITY: usize = 256;

/// Generate a unique subscription ID.
pub fn generate_subscription_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

/// Output of one relay task.
#[derive(Debug)]
enum RelayItem<T> {
    Item(T),
    Failed(SourceError),
}

/// A pool of Nostr relay connections.
#[derive(Debug, Clone)]
pub struct RelayPool {
    connect_timeout: Duration,
}

impl Default for RelayPool {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl RelayPool {
    /// Create a new relay pool.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Create a pool using the connect timeout from `config`.
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(config.connect_timeout())
    }
}

impl EventSource for RelayPool {
    fn query(&self, relays: &[String], filter: Filter) -> SourceStream<Event> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let subscription_id = generate_subscription_id();

        for url in relays {
            tokio::spawn(query_relay(
                url.clone(),
                subscription_id.clone(),
                filter.clone(),
                self.connect_timeout,
                tx.clone(),
            ));
        }

        merged(rx, relays.len(), event_key)
    }

    fn publish(&self, relays: &[String], event: Event) -> SourceStream<PublishConfirmation> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        for url in relays {
            tokio::spawn(publish_relay(
                url.clone(),
                event.clone(),
                self.connect_timeout,
                tx.clone(),
            ));
        }

        merged(rx, relays.len(), no_key)
    }
}

/// Id-less events are never treated as duplicates of each other.
fn event_key(event: &Event) -> Option<&str> {
    (!event.id.is_empty()).then_some(event.id.as_str())
}

fn no_key<T>(_: &T) -> Option<&str> {
    None
}

struct Merge<T> {
    rx: mpsc::Receiver<RelayItem<T>>,
    relays: usize,
    failures: usize,
    seen: HashSet<String>,
    key: fn(&T) -> Option<&str>,
}

/// Fan relay task output into one stream.
fn merged<T: Send + 'static>(
    rx: mpsc::Receiver<RelayItem<T>>,
    relays: usize,
    key: fn(&T) -> Option<&str>,
) -> SourceStream<T> {
    let state = Merge {
        rx,
        relays,
        failures: 0,
        seen: HashSet::new(),
        key,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            match state.rx.recv().await? {
                RelayItem::Item(item) => {
                    if let Some(id) = (state.key)(&item)
                        && !state.seen.insert(id.to_string())
                    {
                        continue;
                    }
                    return Some((Ok(item), state));
                }
                RelayItem::Failed(err) => {
                    state.failures += 1;
                    warn!("Relay failed ({}/{}): {}", state.failures, state.relays, err);
                    if state.failures == state.relays {
                        return Some((Err(err), state));
                    }
                }
            }
        }
    })
    .boxed()
}

async fn connect(url: &str, connect_timeout: Duration) -> Result<WsStream, SourceError> {
    match timeout(connect_timeout, connect_async(url)).await {
        Ok(Ok((stream, _))) => {
            info!("Connected to relay: {}", url);
            Ok(stream)
        }
        Ok(Err(e)) => Err(SourceError::Connection(format!("{}: {}", url, e))),
        Err(_) => Err(SourceError::Connection(format!(
            "{}: connection timeout after {:?}",
            url, connect_timeout
        ))),
    }
}

/// Connect to `url` unless the consumer drops the stream first.
///
/// Connection failures are forwarded to the consumer.
async fn connect_while_wanted<T>(
    url: &str,
    connect_timeout: Duration,
    tx: &mpsc::Sender<RelayItem<T>>,
) -> Option<WsStream> {
    let result = tokio::select! {
        biased;

        _ = tx.closed() => {
            debug!("Stream dropped before {} connected", url);
            return None;
        }
        result = connect(url, connect_timeout) => result,
    };

    match result {
        Ok(mut ws) if tx.is_closed() => {
            debug!("Stream dropped while connecting to {}", url);
            let _ = ws.close(None).await;
            None
        }
        Ok(ws) => Some(ws),
        Err(e) => {
            let _ = tx.send(RelayItem::Failed(e)).await;
            None
        }
    }
}

async fn send(ws: &mut WsStream, msg: &ClientMessage) -> Result<(), SourceError> {
    let text = msg
        .to_json()
        .map_err(|e| SourceError::Protocol(e.to_string()))?;
    ws.send(Message::Text(text.into()))
        .await
        .map_err(|e| SourceError::WebSocket(e.to_string()))
}

async fn close_subscription(ws: &mut WsStream, url: &str, subscription_id: &str) {
    let close = ClientMessage::Close {
        subscription_id: subscription_id.to_string(),
    };
    if let Err(e) = send(ws, &close).await {
        debug!("Failed to close subscription {} on {}: {}", subscription_id, url, e);
    }
}

async fn query_relay(
    url: String,
    subscription_id: String,
    filter: Filter,
    connect_timeout: Duration,
    tx: mpsc::Sender<RelayItem<Event>>,
) {
    let Some(mut ws) = connect_while_wanted(&url, connect_timeout, &tx).await else {
        return;
    };

    let req = ClientMessage::Req {
        subscription_id: subscription_id.clone(),
        filters: vec![filter.clone()],
    };
    if let Err(e) = send(&mut ws, &req).await {
        let _ = tx.send(RelayItem::Failed(e)).await;
        return;
    }

    loop {
        tokio::select! {
            _ = tx.closed() => {
                debug!("Subscription {} dropped, closing on {}", subscription_id, url);
                close_subscription(&mut ws, &url, &subscription_id).await;
                break;
            }
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => match RelayMessage::from_json(text.as_str()) {
                    Ok(RelayMessage::Event { subscription_id: sub_id, event })
                        if sub_id == subscription_id =>
                    {
                        if !filter.matches(&event) {
                            debug!("Dropping event {} outside filter from {}", event.id, url);
                            continue;
                        }
                        if tx.send(RelayItem::Item(event)).await.is_err() {
                            close_subscription(&mut ws, &url, &subscription_id).await;
                            break;
                        }
                    }
                    Ok(RelayMessage::Eose { subscription_id: sub_id })
                        if sub_id == subscription_id =>
                    {
                        debug!("EOSE for {} from {}", subscription_id, url);
                        close_subscription(&mut ws, &url, &subscription_id).await;
                        break;
                    }
                    Ok(RelayMessage::Closed { subscription_id: sub_id, message })
                        if sub_id == subscription_id =>
                    {
                        warn!("Relay {} closed subscription {}: {}", url, subscription_id, message);
                        break;
                    }
                    Ok(RelayMessage::Notice { message }) => {
                        debug!("Notice from {}: {}", url, message);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Ignoring malformed message from {}: {}", url, e);
                    }
                },
                Some(Ok(Message::Ping(data))) => {
                    let _ = ws.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Relay {} closed connection", url);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = tx
                        .send(RelayItem::Failed(SourceError::WebSocket(format!("{}: {}", url, e))))
                        .await;
                    break;
                }
            },
        }
    }

    let _ = ws.close(None).await;
}

async fn publish_relay(
    url: String,
    event: Event,
    connect_timeout: Duration,
    tx: mpsc::Sender<RelayItem<PublishConfirmation>>,
) {
    let Some(mut ws) = connect_while_wanted(&url, connect_timeout, &tx).await else {
        return;
    };

    let event_id = event.id.clone();
    if let Err(e) = send(&mut ws, &ClientMessage::Event(event)).await {
        let _ = tx.send(RelayItem::Failed(e)).await;
        return;
    }

    loop {
        tokio::select! {
            _ = tx.closed() => break,
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => match RelayMessage::from_json(text.as_str()) {
                    Ok(RelayMessage::Ok { event_id: id, success, message }) if id == event_id => {
                        if success {
                            info!("Relay {} accepted event {}", url, event_id);
                        } else {
                            warn!("Relay {} rejected event {}: {}", url, event_id, message);
                        }
                        let confirmation = PublishConfirmation {
                            relay_url: url.clone(),
                            event_id: event_id.clone(),
                            accepted: success,
                            message,
                        };
                        let _ = tx.send(RelayItem::Item(confirmation)).await;
                        break;
                    }
                    Ok(RelayMessage::Notice { message }) => {
                        debug!("Notice from {}: {}", url, message);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Ignoring malformed message from {}: {}", url, e);
                    }
                },
                Some(Ok(Message::Ping(data))) => {
                    let _ = ws.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Relay {} closed connection", url);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = tx
                        .send(RelayItem::Failed(SourceError::WebSocket(format!("{}: {}", url, e))))
                        .await;
                    break;
                }
            },
        }
    }

    let _ = ws.close(None).await;
}
