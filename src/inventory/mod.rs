//! Inventory state machine.
//!
//! Owns the per-book availability lifecycle `Available -> Rented -> Available`.
//! Every mutation is one conditional request against the catalog store, guarded
//! on the `is_available` value the caller expects, so two renters can never
//! both commit a reservation for the same book.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::RentalError;
use crate::interfaces::{CatalogStore, StorageError};
use crate::model::{Book, BookDetails, BookId, BookPatch, UserId};
use crate::session::Session;

/// Availability transitions and owner edits for books.
#[derive(Clone)]
pub struct Inventory {
    store: Arc<dyn CatalogStore>,
}

/// Translate a store error for `book_id`, turning a failed guard into
/// `on_guard_failure`.
fn map_store_error(err: StorageError, book_id: BookId, on_guard_failure: RentalError) -> RentalError {
    match err {
        StorageError::PreconditionFailed { .. } => on_guard_failure,
        StorageError::NotFound { .. } => RentalError::NotFound { book_id },
        other => RentalError::Storage(other),
    }
}

impl Inventory {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Read-through fetch of the current record.
    pub async fn get_book(&self, book_id: BookId) -> Result<Book, RentalError> {
        self.store
            .get_book(book_id)
            .await
            .map_err(|e| map_store_error(e, book_id, RentalError::NotFound { book_id }))
    }

    /// Claim an available book for `renter`.
    ///
    /// Ownership is checked before availability, so an owner is refused with
    /// `OwnershipViolation` whatever the book's state. A `Conflict` is final;
    /// it is never retried here.
    pub async fn try_reserve(&self, book_id: BookId, renter: &UserId) -> Result<Book, RentalError> {
        let book = self.get_book(book_id).await?;

        if book.is_owned_by(renter) {
            warn!(book_id = %book_id, user_id = %renter, "Owner attempted to rent own book");
            return Err(RentalError::OwnershipViolation { book_id });
        }
        if !book.is_available {
            warn!(book_id = %book_id, user_id = %renter, outcome = "unavailable", "Reservation refused");
            return Err(RentalError::Conflict { book_id });
        }

        let reserved = self
            .store
            .conditional_update_book(book_id, true, None, BookPatch::reserve(renter.clone(), Utc::now()))
            .await
            .map_err(|e| map_store_error(e, book_id, RentalError::Conflict { book_id }))
            .inspect_err(|e| {
                if matches!(e, RentalError::Conflict { .. }) {
                    warn!(book_id = %book_id, user_id = %renter, outcome = "lost_race", "Reservation refused");
                }
            })?;

        info!(book_id = %book_id, user_id = %renter, "Book reserved");
        Ok(reserved)
    }

    /// Owner confirms the book came back; it becomes available again.
    pub async fn mark_returned(&self, book_id: BookId, requester: &UserId) -> Result<Book, RentalError> {
        self.release(book_id, requester).await.map(|(book, _)| book)
    }

    /// [`mark_returned`](Self::mark_returned), also yielding the renter whose
    /// rental was closed.
    ///
    /// The write is guarded on that renter as well as on availability, so the
    /// returned renter is the one actually released. A book returned and rented
    /// again in between surfaces as `Conflict`.
    pub async fn release(
        &self,
        book_id: BookId,
        requester: &UserId,
    ) -> Result<(Book, Option<UserId>), RentalError> {
        let book = self.get_book(book_id).await?;

        if !book.is_owned_by(requester) {
            return Err(RentalError::PermissionDenied { book_id });
        }
        if book.is_available {
            return Err(RentalError::AlreadyAvailable { book_id });
        }

        let renter = book.rented_by;
        let released = match self
            .store
            .conditional_update_book(book_id, false, renter.as_ref(), BookPatch::release(Utc::now()))
            .await
        {
            Ok(released) => released,
            Err(StorageError::PreconditionFailed { .. }) => {
                let current = self.get_book(book_id).await?;
                warn!(book_id = %book_id, user_id = %requester, outcome = "stale", "Return refused");
                return Err(if current.is_available {
                    RentalError::AlreadyAvailable { book_id }
                } else {
                    RentalError::Conflict { book_id }
                });
            }
            Err(e) => return Err(map_store_error(e, book_id, RentalError::AlreadyAvailable { book_id })),
        };

        info!(book_id = %book_id, user_id = %requester, "Book returned");
        Ok((released, renter))
    }

    /// Owner removes an available book from the catalog.
    pub async fn delete(&self, book_id: BookId, requester: &UserId) -> Result<(), RentalError> {
        let book = self.get_book(book_id).await?;

        if !book.is_owned_by(requester) {
            return Err(RentalError::PermissionDenied { book_id });
        }
        if !book.is_available {
            return Err(RentalError::ResourceBusy { book_id });
        }

        self.store
            .conditional_delete_book(book_id, true)
            .await
            .map_err(|e| map_store_error(e, book_id, RentalError::ResourceBusy { book_id }))?;

        info!(book_id = %book_id, user_id = %requester, "Book deleted");
        Ok(())
    }

    /// List a new available book owned by the session user.
    pub async fn list_book(&self, session: &Session, details: BookDetails) -> Result<Book, RentalError> {
        details.validate()?;
        let book = self.store.insert_book(session.user_id(), details).await?;
        info!(book_id = %book.id, user_id = %session.user_id(), "Book listed");
        Ok(book)
    }

    /// Replace a book's details. Availability fields are left alone.
    ///
    /// The write is guarded on the availability seen by the read, so a rental
    /// landing in between surfaces as `Conflict` instead of being overwritten.
    pub async fn edit_book(
        &self,
        session: &Session,
        book_id: BookId,
        details: BookDetails,
    ) -> Result<Book, RentalError> {
        details.validate()?;
        let book = self.get_book(book_id).await?;

        if !book.is_owned_by(session.user_id()) {
            return Err(RentalError::PermissionDenied { book_id });
        }

        let edited = self
            .store
            .conditional_update_book(book_id, book.is_available, None, BookPatch::details(details))
            .await
            .map_err(|e| map_store_error(e, book_id, RentalError::Conflict { book_id }))?;

        info!(book_id = %book_id, user_id = %session.user_id(), "Book edited");
        Ok(edited)
    }
}
