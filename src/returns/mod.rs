//! Owner-initiated return confirmation.
//!
//! The owner confirms a rented book came back. The book becomes available
//! again, a `Returned` audit record is appended next to the original rental
//! record, and the renter is notified. Only the state transition is
//! mandatory; the audit entry and the notification are best-effort.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::RentalError;
use crate::interfaces::CatalogStore;
use crate::inventory::Inventory;
use crate::model::{Book, BookId, RentalStatus, UserId};
use crate::notifications::NotificationDispatcher;
use crate::session::Session;

/// What a confirmed return did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnReceipt {
    pub book: Book,
    pub renter: Option<UserId>,
    pub returned_at: DateTime<Utc>,
    /// Whether the `Returned` audit record was stored.
    pub audit_recorded: bool,
    pub notified: bool,
}

#[derive(Clone)]
pub struct ReturnDesk {
    store: Arc<dyn CatalogStore>,
    inventory: Inventory,
    dispatcher: NotificationDispatcher,
}

impl ReturnDesk {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            inventory: Inventory::new(store.clone()),
            dispatcher: NotificationDispatcher::new(store.clone()),
            store,
        }
    }

    /// Confirm that `book_id`, owned by the session user, was returned.
    #[tracing::instrument(name = "returns.confirm", skip_all, fields(user_id = %session.user_id(), book_id = %book_id))]
    pub async fn confirm_return(&self, session: &Session, book_id: BookId) -> Result<ReturnReceipt, RentalError> {
        let (book, renter) = self.inventory.release(book_id, session.user_id()).await?;
        let returned_at = book.last_returned_at.unwrap_or_else(Utc::now);

        let (audit_recorded, notified) = match &renter {
            Some(renter) => (
                self.record_return(&book, renter, returned_at).await,
                self.dispatcher.notify_return(&book, renter, returned_at).await > 0,
            ),
            None => {
                warn!("Returned book had no recorded renter");
                (false, false)
            }
        };

        info!(audit_recorded, notified, "Return confirmed");
        Ok(ReturnReceipt {
            book,
            renter,
            returned_at,
            audit_recorded,
            notified,
        })
    }

    /// Append the `Returned` companion of the open rental record.
    async fn record_return(&self, book: &Book, renter: &UserId, returned_at: DateTime<Utc>) -> bool {
        let rentals = match self.store.query_rentals_by_book(book.id).await {
            Ok(rentals) => rentals,
            Err(e) => {
                error!(error = %e, "Failed to read rental records");
                return false;
            }
        };

        let open = rentals
            .iter()
            .rev()
            .find(|r| r.status == RentalStatus::Rented && &r.renter_id == renter);
        let Some(open) = open else {
            warn!(renter_id = %renter, "No rental record to close");
            return false;
        };

        match self.store.append_rental_record(open.returned(returned_at)).await {
            Ok(_) => true,
            Err(e) => {
                error!(rental_id = %open.id, error = %e, "Failed to record return");
                false
            }
        }
    }
}
