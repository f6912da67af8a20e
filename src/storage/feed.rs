//! Change feed for live updates.
//!
//! Stores publish every successful write on a broadcast channel; each
//! [`Subscription`] is one receiver on it. Dropping the subscription
//! unsubscribes.

use futures::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::models::VisitorRecord;

/// A row-level change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Inserted(VisitorRecord),
    Updated(VisitorRecord),
}

impl ChangeEvent {
    pub fn record(&self) -> &VisitorRecord {
        match self {
            ChangeEvent::Inserted(record) | ChangeEvent::Updated(record) => record,
        }
    }
}

/// Live subscription to a store's change feed.
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn new(receiver: broadcast::Receiver<ChangeEvent>) -> Self {
        Subscription { receiver }
    }

    /// Next change event, or `None` once the store has gone away.
    ///
    /// If this subscriber fell behind and the channel dropped events, the
    /// gap is logged and delivery resumes with the oldest retained event.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "Live update subscriber lagged; {} change event(s) skipped",
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Lazy stream of change events, ending when the store goes away.
    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .recv()
                .await
                .map(|event| (event, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        log::debug!("Live update subscription released");
    }
}
