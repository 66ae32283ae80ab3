//! Broadcast fan-out shared by every store adapter.

use domains::{ChangeFeed, StoreChange};
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Publishes store changes to any number of subscribers.
///
/// Subscribers that fall more than `capacity` events behind lose the
/// overflow. Nothing is replayed.
#[derive(Clone, Debug)]
pub struct ChangeHub {
    sender: broadcast::Sender<StoreChange>,
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, change: StoreChange) {
        // An error only means nobody is listening right now.
        let _ = self.sender.send(change);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ChangeFeed for ChangeHub {
    fn subscribe(&self) -> BoxStream<'static, StoreChange> {
        BroadcastStream::new(self.sender.subscribe())
            .filter_map(|item| async move {
                match item {
                    Ok(change) => Some(change),
                    Err(err) => {
                        tracing::debug!(error = %err, "change subscriber lagged");
                        None
                    }
                }
            })
            .boxed()
    }
}
