//! In-process notification change feed.
//!
//! Uses a tokio broadcast channel shared by all subscribers of one store.
//! Recipient filtering is done on the subscriber side.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::interfaces::{NotificationListener, Subscription};
use crate::model::{NotificationChange, UserId};

/// Broadcast fan-out of notification changes.
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    sender: broadcast::Sender<Arc<NotificationChange>>,
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Push a change to current subscribers. Having none is not an error.
    pub fn publish(&self, change: NotificationChange) {
        let receivers = self.sender.send(Arc::new(change)).unwrap_or(0);
        debug!(receivers, "Notification change published");
    }

    /// Spawn a task delivering `user`'s changes to `listener`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self, user: &UserId, listener: Arc<dyn NotificationListener>) -> Subscription {
        let mut receiver = self.sender.subscribe();
        let filter = user.clone();

        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(change) => {
                        if change.recipient() == &filter {
                            listener.on_change((*change).clone());
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(user_id = %filter, skipped, "Notification subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        debug!(user_id = %user, "Notification subscription opened");
        Subscription::new(user.clone(), task)
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(256)
    }
}
