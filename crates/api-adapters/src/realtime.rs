//! Server-Sent Event channels.
//!
//! Each event carries the operation in its `event:` field and the serialized
//! [`domains::ChangeEvent`] as data. Events are at most once: a client that
//! disconnects or lags misses them and must reload.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use domains::ChangeEvent;
use futures::future;
use futures::stream::{BoxStream, Stream, StreamExt};
use prometheus_client::metrics::gauge::Gauge;
use serde::Serialize;

use crate::error::ApiError;
use crate::handlers::{AppState, ThreadQuery};

pub type EventStream = BoxStream<'static, Result<Event, Infallible>>;

/// Keeps the subscriber gauge honest for as long as the stream is alive.
struct SubscriberGuard(Gauge);

impl SubscriberGuard {
    fn open(gauge: &Gauge) -> Self {
        gauge.inc();
        Self(gauge.clone())
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

fn to_sse<T, S>(changes: S, guard: SubscriberGuard) -> EventStream
where
    T: Serialize + Send + 'static,
    S: Stream<Item = ChangeEvent<T>> + Send + 'static,
{
    changes
        .filter_map(move |change| {
            let _held = &guard;
            future::ready(match Event::default().event(change.kind()).json_data(&change) {
                Ok(event) => Some(Ok(event)),
                Err(err) => {
                    tracing::warn!(error = %err, "could not encode change event");
                    None
                }
            })
        })
        .boxed()
}

/// `GET /realtime/ideas`: every change on the ideas table.
pub async fn board_events(State(state): State<AppState>) -> Sse<KeepAliveStream<EventStream>> {
    let guard = SubscriberGuard::open(&state.metrics.realtime_subscribers);
    tracing::debug!("board channel subscribed");
    Sse::new(to_sse(state.realtime.board_channel(), guard))
        .keep_alive(KeepAlive::new().interval(state.keep_alive))
}

/// `GET /realtime/messages?idea_id=`: message changes of one thread.
pub async fn thread_events(
    State(state): State<AppState>,
    Query(query): Query<ThreadQuery>,
) -> Result<Sse<KeepAliveStream<EventStream>>, ApiError> {
    let changes = state.realtime.thread_channel(query.idea_id.as_deref())?;
    let guard = SubscriberGuard::open(&state.metrics.realtime_subscribers);
    Ok(Sse::new(to_sse(changes, guard)).keep_alive(KeepAlive::new().interval(state.keep_alive)))
}
