//! Retry decorator for catalog stores.
//!
//! Wraps any `CatalogStore` and repeats calls that failed with a transient
//! error, using the configured exponential backoff. Precondition failures and
//! missing records pass through on the first attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use tracing::warn;

use crate::config::RetryConfig;
use crate::interfaces::catalog_store::{CatalogStore, Result, StorageError};
use crate::interfaces::{NotificationListener, Subscription};
use crate::model::{
    Book, BookDetails, BookId, BookPatch, CartItem, Notification, NotificationId, RentalId,
    RentalRecord, UserId,
};
use crate::utils::retry::{is_retryable, store_backoff};

/// Catalog store that retries transient failures of an inner store.
pub struct RetryingCatalogStore {
    inner: Arc<dyn CatalogStore>,
    config: RetryConfig,
}

impl RetryingCatalogStore {
    pub fn new(inner: Arc<dyn CatalogStore>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        attempt
            .retry(store_backoff(&self.config))
            .when(is_retryable)
            .notify(|err: &StorageError, dur: Duration| {
                warn!(operation, error = %err, delay = ?dur, "Catalog store call failed, retrying");
            })
            .await
    }
}

#[async_trait]
impl CatalogStore for RetryingCatalogStore {
    async fn get_book(&self, id: BookId) -> Result<Book> {
        self.call("get_book", || self.inner.get_book(id)).await
    }

    async fn insert_book(&self, owner: &UserId, details: BookDetails) -> Result<Book> {
        self.call("insert_book", || self.inner.insert_book(owner, details.clone()))
            .await
    }

    async fn conditional_update_book(
        &self,
        id: BookId,
        expected_available: bool,
        expected_renter: Option<&UserId>,
        patch: BookPatch,
    ) -> Result<Book> {
        self.call("conditional_update_book", || {
            self.inner
                .conditional_update_book(id, expected_available, expected_renter, patch.clone())
        })
        .await
    }

    async fn conditional_delete_book(&self, id: BookId, expected_available: bool) -> Result<()> {
        self.call("conditional_delete_book", || {
            self.inner.conditional_delete_book(id, expected_available)
        })
        .await
    }

    async fn query_books_by_owner(&self, owner: &UserId) -> Result<Vec<Book>> {
        self.call("query_books_by_owner", || self.inner.query_books_by_owner(owner))
            .await
    }

    async fn query_books_by_renter(&self, renter: &UserId) -> Result<Vec<Book>> {
        self.call("query_books_by_renter", || self.inner.query_books_by_renter(renter))
            .await
    }

    async fn list_available_books(&self) -> Result<Vec<Book>> {
        self.call("list_available_books", || self.inner.list_available_books())
            .await
    }

    async fn append_rental_record(&self, record: RentalRecord) -> Result<RentalId> {
        self.call("append_rental_record", || {
            self.inner.append_rental_record(record.clone())
        })
        .await
    }

    async fn query_rentals_by_book(&self, book_id: BookId) -> Result<Vec<RentalRecord>> {
        self.call("query_rentals_by_book", || self.inner.query_rentals_by_book(book_id))
            .await
    }

    async fn query_rentals_by_renter(&self, renter: &UserId) -> Result<Vec<RentalRecord>> {
        self.call("query_rentals_by_renter", || {
            self.inner.query_rentals_by_renter(renter)
        })
        .await
    }

    async fn append_notification(&self, notification: Notification) -> Result<NotificationId> {
        self.call("append_notification", || {
            self.inner.append_notification(notification.clone())
        })
        .await
    }

    async fn get_notification(&self, id: NotificationId) -> Result<Notification> {
        self.call("get_notification", || self.inner.get_notification(id))
            .await
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<()> {
        self.call("mark_notification_read", || self.inner.mark_notification_read(id))
            .await
    }

    async fn list_notifications(&self, recipient: &UserId) -> Result<Vec<Notification>> {
        self.call("list_notifications", || self.inner.list_notifications(recipient))
            .await
    }

    async fn put_cart_item(&self, item: CartItem) -> Result<()> {
        self.call("put_cart_item", || self.inner.put_cart_item(item.clone()))
            .await
    }

    async fn remove_cart_item(&self, user: &UserId, book_id: BookId) -> Result<()> {
        self.call("remove_cart_item", || self.inner.remove_cart_item(user, book_id))
            .await
    }

    async fn clear_cart(&self, user: &UserId) -> Result<()> {
        self.call("clear_cart", || self.inner.clear_cart(user)).await
    }

    async fn list_cart_items(&self, user: &UserId) -> Result<Vec<CartItem>> {
        self.call("list_cart_items", || self.inner.list_cart_items(user))
            .await
    }

    async fn subscribe_to_notifications(
        &self,
        user: &UserId,
        listener: Arc<dyn NotificationListener>,
    ) -> Result<Subscription> {
        self.call("subscribe_to_notifications", || {
            self.inner.subscribe_to_notifications(user, listener.clone())
        })
        .await
    }
}
