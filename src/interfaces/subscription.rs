//! Live notification subscriptions.

use tokio::task::JoinHandle;
use tracing::debug;

use crate::model::{NotificationChange, UserId};

/// Receives notification changes for one user.
pub trait NotificationListener: Send + Sync + 'static {
    fn on_change(&self, change: NotificationChange);
}

impl<F> NotificationListener for F
where
    F: Fn(NotificationChange) + Send + Sync + 'static,
{
    fn on_change(&self, change: NotificationChange) {
        self(change)
    }
}

/// Handle to a running subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    user: UserId,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(user: UserId, task: JoinHandle<()>) -> Self {
        Self {
            user,
            task: Some(task),
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop delivering changes.
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(user_id = %self.user, "Notification subscription closed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}
