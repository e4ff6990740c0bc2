//! Error taxonomy for rental operations.

use chrono::NaiveDate;

use crate::checkout::SkippedItem;
use crate::interfaces::StorageError;
use crate::model::{BookId, NotificationId, Price, UserId};

/// Input rejected before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Delivery address is required")]
    MissingAddress,

    #[error("Return date {return_date} is before today ({today})")]
    ReturnDateInPast {
        return_date: NaiveDate,
        today: NaiveDate,
    },

    #[error("Title is required")]
    MissingTitle,

    #[error("Author is required")]
    MissingAuthor,

    #[error("Price {price} exceeds the maximum of {}", Price::MAX)]
    PriceTooLarge { price: Price },

    #[error("Nothing to check out")]
    EmptyCheckout,

    #[error("Checkout has {count} items, limit is {limit}")]
    TooManyItems { count: usize, limit: usize },

    #[error("Cart belongs to {cart_user}, not {session_user}")]
    CartOwnerMismatch { cart_user: UserId, session_user: UserId },
}

/// Errors from inventory, return, and notification operations.
#[derive(Debug, thiserror::Error)]
pub enum RentalError {
    #[error("Book not found: {book_id}")]
    NotFound { book_id: BookId },

    #[error("Book {book_id} was claimed by another renter")]
    Conflict { book_id: BookId },

    #[error("Owners cannot rent their own book {book_id}")]
    OwnershipViolation { book_id: BookId },

    #[error("Only the owner may change book {book_id}")]
    PermissionDenied { book_id: BookId },

    #[error("Notification {id} belongs to another user")]
    NotificationPermissionDenied { id: NotificationId },

    #[error("Notification not found: {id}")]
    NotificationNotFound { id: NotificationId },

    #[error("Book {book_id} is rented and cannot be deleted")]
    ResourceBusy { book_id: BookId },

    #[error("Book {book_id} is already available")]
    AlreadyAvailable { book_id: BookId },

    #[error("No signed-in user")]
    Unauthenticated,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RentalError {
    /// Whether the caller may retry the same request as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_retryable())
    }
}

/// Batch-level checkout failures. Per-item problems are reported in the
/// checkout report instead.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("None of the {} requested books could be rented", .skipped.len())]
    NothingRentable { skipped: Vec<SkippedItem> },

    #[error("A checkout is already in progress for this user")]
    AlreadyInProgress,
}
