//! Deadline race over a source stream.
//!
//! [`race`] drives a [`SourceStream`] until the item callback breaks, the
//! stream ends, the stream fails, or the deadline passes, whichever happens
//! first. It settles exactly once. The stream is owned by the race and
//! dropped before the settlement is returned, which closes the underlying
//! subscription on every exit path.

use crate::source::{SourceError, SourceStream};
use futures::StreamExt;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// How a race ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement<T> {
    /// The item callback asked to stop with a value.
    Matched(T),
    /// The source finished on its own.
    Completed,
    /// The source reported an error.
    Failed(SourceError),
    /// The deadline passed first.
    TimedOut,
}

/// Race `stream` against `deadline`.
///
/// `on_item` sees items in delivery order. Returning
/// `ControlFlow::Break(value)` settles the race with
/// [`Settlement::Matched`]; callers that accumulate state capture it in the
/// closure and read it after the race returns.
pub async fn race<I, T, F>(
    label: &str,
    mut stream: SourceStream<I>,
    deadline: Duration,
    mut on_item: F,
) -> Settlement<T>
where
    F: FnMut(I) -> ControlFlow<T>,
{
    let expires = Instant::now() + deadline;
    let timer = sleep_until(expires);
    tokio::pin!(timer);

    let settlement = loop {
        // A stream that is always ready never lets the timer driver fire.
        if Instant::now() >= expires {
            break Settlement::TimedOut;
        }

        tokio::select! {
            biased;

            _ = &mut timer => break Settlement::TimedOut,
            next = stream.next() => match next {
                Some(Ok(item)) => {
                    if let ControlFlow::Break(value) = on_item(item) {
                        break Settlement::Matched(value);
                    }
                }
                Some(Err(e)) => break Settlement::Failed(e),
                None => break Settlement::Completed,
            },
        }
    };

    drop(stream);
    debug!("{} settled: {}", label, settlement_name(&settlement));
    settlement
}

fn settlement_name<T>(settlement: &Settlement<T>) -> &'static str {
    match settlement {
        Settlement::Matched(_) => "matched",
        Settlement::Completed => "completed",
        Settlement::Failed(_) => "failed",
        Settlement::TimedOut => "timed out",
    }
}
