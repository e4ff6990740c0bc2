//! Catalog store interface.

use std::sync::Arc;

use async_trait::async_trait;

use super::subscription::{NotificationListener, Subscription};
use crate::model::{
    Book, BookDetails, BookId, BookPatch, CartItem, Notification, NotificationId, RentalId,
    RentalRecord, UserId,
};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{collection} not found: {id}")]
    NotFound { collection: &'static str, id: String },

    #[error("Precondition failed for book {book_id}: expected is_available={expected}")]
    PreconditionFailed { book_id: BookId, expected: bool },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("{field} out of range for storage: {value}")]
    OutOfRange { field: &'static str, value: u64 },

    #[error("Corrupt {collection} record: {reason}")]
    Corrupt {
        collection: &'static str,
        reason: String,
    },

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    pub fn book_not_found(id: BookId) -> Self {
        Self::NotFound {
            collection: "book",
            id: id.to_string(),
        }
    }

    pub fn notification_not_found(id: NotificationId) -> Self {
        Self::NotFound {
            collection: "notification",
            id: id.to_string(),
        }
    }

    /// Whether repeating the same call could succeed.
    ///
    /// Precondition failures and missing records are answers, not faults.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            #[cfg(feature = "sqlite")]
            Self::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed
            ),
            Self::NotFound { .. }
            | Self::PreconditionFailed { .. }
            | Self::OutOfRange { .. }
            | Self::Corrupt { .. } => false,
        }
    }
}

/// Interface to the document store holding books, cart mirrors, rental
/// records and notifications.
///
/// Collections are independent; the store enforces no referential integrity.
/// Book mutations go exclusively through the conditional operations, which
/// must be a single compare-and-set on `is_available`.
///
/// Implementations:
/// - `InMemoryCatalogStore`: process-local maps
/// - `SqliteCatalogStore`: SQLite via sqlx
/// - `RetryingCatalogStore`: decorator applying the retry policy
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_book(&self, id: BookId) -> Result<Book>;

    /// Insert a new available book owned by `owner`. The store assigns the id.
    async fn insert_book(&self, owner: &UserId, details: BookDetails) -> Result<Book>;

    /// Apply `patch` iff the book's `is_available` equals `expected_available`
    /// and, when `expected_renter` is given, its `rented_by` equals it.
    ///
    /// Returns the updated book, `PreconditionFailed` when the guard does not
    /// hold, or `NotFound`.
    async fn conditional_update_book(
        &self,
        id: BookId,
        expected_available: bool,
        expected_renter: Option<&UserId>,
        patch: BookPatch,
    ) -> Result<Book>;

    /// Delete the book iff its `is_available` equals `expected_available`.
    async fn conditional_delete_book(&self, id: BookId, expected_available: bool) -> Result<()>;

    async fn query_books_by_owner(&self, owner: &UserId) -> Result<Vec<Book>>;

    async fn query_books_by_renter(&self, renter: &UserId) -> Result<Vec<Book>>;

    async fn list_available_books(&self) -> Result<Vec<Book>>;

    async fn append_rental_record(&self, record: RentalRecord) -> Result<RentalId>;

    async fn query_rentals_by_book(&self, book_id: BookId) -> Result<Vec<RentalRecord>>;

    async fn query_rentals_by_renter(&self, renter: &UserId) -> Result<Vec<RentalRecord>>;

    async fn append_notification(&self, notification: Notification) -> Result<NotificationId>;

    async fn get_notification(&self, id: NotificationId) -> Result<Notification>;

    async fn mark_notification_read(&self, id: NotificationId) -> Result<()>;

    async fn list_notifications(&self, recipient: &UserId) -> Result<Vec<Notification>>;

    /// Insert or replace the mirrored cart item for `(item.user_id, item.book_id)`.
    async fn put_cart_item(&self, item: CartItem) -> Result<()>;

    async fn remove_cart_item(&self, user: &UserId, book_id: BookId) -> Result<()>;

    async fn clear_cart(&self, user: &UserId) -> Result<()>;

    /// Mirrored cart items in the order they were first added.
    async fn list_cart_items(&self, user: &UserId) -> Result<Vec<CartItem>>;

    /// Push notification changes for `user` to `listener` until the returned
    /// subscription is dropped or unsubscribed.
    async fn subscribe_to_notifications(
        &self,
        user: &UserId,
        listener: Arc<dyn NotificationListener>,
    ) -> Result<Subscription>;
}
