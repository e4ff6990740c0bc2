//! Notification dispatcher.
//!
//! Every committed rental produces two records, one for the owner and one for
//! the renter, both carrying the book id and the rental timestamp. Delivery is
//! best-effort: a failed append is logged and counted, never propagated back
//! into the rental that triggered it.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error};

use crate::error::RentalError;
use crate::interfaces::{CatalogStore, NotificationListener, StorageError, Subscription, UserProfile};
use crate::model::{Book, Notification, NotificationId, NotificationKind, UserId};
use crate::session::Session;

/// Writes and reads notification records.
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn CatalogStore>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Notify owner and renter of a committed rental.
    ///
    /// Returns how many of the two records were stored.
    pub async fn notify_rental(
        &self,
        book: &Book,
        renter: &UserProfile,
        delivery_address: &str,
        return_date: NaiveDate,
        rented_at: DateTime<Utc>,
    ) -> usize {
        let to_owner = Notification::new(
            book.owner_id.clone(),
            NotificationKind::RentalToOwner,
            book.id,
            rented_at,
            format!(
                "{} rented \"{}\". Deliver to: {}",
                renter.display_name, book.title, delivery_address
            ),
        );
        let to_renter = Notification::new(
            renter.id.clone(),
            NotificationKind::RentalToRenter,
            book.id,
            rented_at,
            format!(
                "You rented \"{}\". Please return it by {}.",
                book.title, return_date
            ),
        );

        let mut delivered = 0;
        for notification in [to_owner, to_renter] {
            if self.deliver(notification).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Tell the renter the owner confirmed the return.
    pub async fn notify_return(&self, book: &Book, renter: &UserId, returned_at: DateTime<Utc>) -> usize {
        let notification = Notification::new(
            renter.clone(),
            NotificationKind::ReturnToRenter,
            book.id,
            returned_at,
            format!("The owner confirmed the return of \"{}\". Thanks!", book.title),
        );
        usize::from(self.deliver(notification).await)
    }

    async fn deliver(&self, notification: Notification) -> bool {
        let recipient = notification.recipient.clone();
        let book_id = notification.book_id;
        let kind = notification.kind;

        match self.store.append_notification(notification).await {
            Ok(id) => {
                debug!(notification_id = %id, user_id = %recipient, book_id = %book_id, kind = kind.as_str(), "Notification stored");
                true
            }
            Err(e) => {
                error!(user_id = %recipient, book_id = %book_id, kind = kind.as_str(), error = %e, "Failed to store notification");
                false
            }
        }
    }

    /// The session user's notifications, newest first.
    pub async fn list(&self, session: &Session) -> Result<Vec<Notification>, RentalError> {
        let mut notifications = self.store.list_notifications(session.user_id()).await?;
        // Stored in append order; reverse first so equal timestamps keep newest-first.
        notifications.reverse();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    pub async fn unread_count(&self, session: &Session) -> Result<usize, RentalError> {
        let notifications = self.store.list_notifications(session.user_id()).await?;
        Ok(notifications.iter().filter(|n| !n.read).count())
    }

    /// Mark one of the session user's notifications read. Idempotent.
    pub async fn mark_read(&self, session: &Session, id: NotificationId) -> Result<(), RentalError> {
        let notification = self.store.get_notification(id).await.map_err(|e| match e {
            StorageError::NotFound { .. } => RentalError::NotificationNotFound { id },
            other => RentalError::Storage(other),
        })?;

        if &notification.recipient != session.user_id() {
            return Err(RentalError::NotificationPermissionDenied { id });
        }
        if notification.read {
            return Ok(());
        }

        self.store.mark_notification_read(id).await.map_err(|e| match e {
            StorageError::NotFound { .. } => RentalError::NotificationNotFound { id },
            other => RentalError::Storage(other),
        })
    }

    /// Live changes to the session user's notifications.
    pub async fn subscribe(
        &self,
        session: &Session,
        listener: Arc<dyn NotificationListener>,
    ) -> Result<Subscription, RentalError> {
        Ok(self
            .store
            .subscribe_to_notifications(session.user_id(), listener)
            .await?)
    }
}
