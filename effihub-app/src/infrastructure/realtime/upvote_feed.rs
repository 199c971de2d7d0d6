use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::UpvoteEvent;

const CHANNEL_CAPACITY: usize = 64;

/// Per-app change feed for the upvotes table.
///
/// Each app id gets its own broadcast channel so events stay ordered per app
/// (not globally). Subscribers unsubscribe by dropping the receiver; senders
/// with no remaining receivers are pruned lazily on publish.
#[derive(Clone)]
pub struct UpvoteFeed {
    channels: Arc<DashMap<Uuid, broadcast::Sender<UpvoteEvent>>>,
}

impl UpvoteFeed {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    pub fn subscribe(&self, app_id: Uuid) -> broadcast::Receiver<UpvoteEvent> {
        self.channels
            .entry(app_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish a committed row change to the app's channel. Called after the
    /// storage write succeeds, never before.
    pub fn publish(&self, event: UpvoteEvent) {
        let app_id = event.app_id();
        if let Some(tx) = self.channels.get(&app_id) {
            if tx.send(event).is_err() {
                // No live subscribers left for this app.
                drop(tx);
                self.channels
                    .remove_if(&app_id, |_, sender| sender.receiver_count() == 0);
            }
        }
    }

    #[cfg(test)]
    fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for UpvoteFeed {
    fn default() -> Self {
        Self::new()
    }
}
