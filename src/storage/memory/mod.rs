//! In-memory catalog store.
//!
//! Holds every collection behind one `RwLock`, so each conditional operation
//! observes and mutates a book under the same write guard. Includes fault
//! injection hooks for exercising failure paths in tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use super::feed::NotificationFeed;
use crate::interfaces::catalog_store::{CatalogStore, Result, StorageError};
use crate::interfaces::{NotificationListener, Subscription};
use crate::model::{
    Book, BookDetails, BookId, BookPatch, CartItem, Notification, NotificationChange,
    NotificationId, RentalId, RentalRecord, UserId,
};

#[derive(Default)]
struct Collections {
    books: IndexMap<BookId, Book>,
    cart: IndexMap<(UserId, BookId), CartItem>,
    rentals: Vec<RentalRecord>,
    notifications: IndexMap<NotificationId, Notification>,
}

/// Catalog store that keeps everything in process memory.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    data: RwLock<Collections>,
    feed: NotificationFeed,
    unavailable: RwLock<bool>,
    transient_failures: RwLock<u32>,
    fail_rental_appends: RwLock<bool>,
    fail_notification_appends: RwLock<bool>,
    fail_cart_writes: RwLock<bool>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed_capacity(capacity: usize) -> Self {
        Self {
            feed: NotificationFeed::new(capacity),
            ..Self::default()
        }
    }

    /// Make every call fail with `Unavailable` until reset.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// Fail the next `count` calls with `Unavailable`, then recover.
    pub async fn fail_next(&self, count: u32) {
        *self.transient_failures.write().await = count;
    }

    pub async fn set_fail_rental_appends(&self, fail: bool) {
        *self.fail_rental_appends.write().await = fail;
    }

    pub async fn set_fail_notification_appends(&self, fail: bool) {
        *self.fail_notification_appends.write().await = fail;
    }

    pub async fn set_fail_cart_writes(&self, fail: bool) {
        *self.fail_cart_writes.write().await = fail;
    }

    /// Every rental record, in append order.
    pub async fn rental_records(&self) -> Vec<RentalRecord> {
        self.data.read().await.rentals.clone()
    }

    /// Every notification, in append order.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.data.read().await.notifications.values().cloned().collect()
    }

    pub async fn book_count(&self) -> usize {
        self.data.read().await.books.len()
    }

    /// Overwrite a stored book, bypassing the conditional operations.
    pub async fn put_book_unchecked(&self, book: Book) {
        self.data.write().await.books.insert(book.id, book);
    }

    async fn check_available(&self) -> Result<()> {
        if *self.unavailable.read().await {
            return Err(StorageError::Unavailable("store offline".to_string()));
        }
        let mut remaining = self.transient_failures.write().await;
        if *remaining > 0 {
            *remaining -= 1;
            return Err(StorageError::Unavailable("injected transient failure".to_string()));
        }
        Ok(())
    }

    async fn check_flag(flag: &RwLock<bool>, what: &str) -> Result<()> {
        if *flag.read().await {
            return Err(StorageError::Unavailable(format!("{what} rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn get_book(&self, id: BookId) -> Result<Book> {
        self.check_available().await?;
        self.data
            .read()
            .await
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::book_not_found(id))
    }

    async fn insert_book(&self, owner: &UserId, details: BookDetails) -> Result<Book> {
        self.check_available().await?;
        let book = Book::listed(BookId::new(), owner.clone(), details, Utc::now());
        self.data.write().await.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn conditional_update_book(
        &self,
        id: BookId,
        expected_available: bool,
        expected_renter: Option<&UserId>,
        patch: BookPatch,
    ) -> Result<Book> {
        self.check_available().await?;
        let mut data = self.data.write().await;
        let book = data
            .books
            .get_mut(&id)
            .ok_or_else(|| StorageError::book_not_found(id))?;

        let renter_matches = expected_renter.map_or(true, |r| book.rented_by.as_ref() == Some(r));
        if book.is_available != expected_available || !renter_matches {
            return Err(StorageError::PreconditionFailed {
                book_id: id,
                expected: expected_available,
            });
        }

        patch.apply_to(book);
        Ok(book.clone())
    }

    async fn conditional_delete_book(&self, id: BookId, expected_available: bool) -> Result<()> {
        self.check_available().await?;
        let mut data = self.data.write().await;
        let book = data
            .books
            .get(&id)
            .ok_or_else(|| StorageError::book_not_found(id))?;

        if book.is_available != expected_available {
            return Err(StorageError::PreconditionFailed {
                book_id: id,
                expected: expected_available,
            });
        }

        data.books.shift_remove(&id);
        Ok(())
    }

    async fn query_books_by_owner(&self, owner: &UserId) -> Result<Vec<Book>> {
        self.check_available().await?;
        let data = self.data.read().await;
        Ok(data
            .books
            .values()
            .filter(|b| &b.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn query_books_by_renter(&self, renter: &UserId) -> Result<Vec<Book>> {
        self.check_available().await?;
        let data = self.data.read().await;
        Ok(data
            .books
            .values()
            .filter(|b| b.rented_by.as_ref() == Some(renter))
            .cloned()
            .collect())
    }

    async fn list_available_books(&self) -> Result<Vec<Book>> {
        self.check_available().await?;
        let data = self.data.read().await;
        Ok(data.books.values().filter(|b| b.is_available).cloned().collect())
    }

    async fn append_rental_record(&self, record: RentalRecord) -> Result<RentalId> {
        self.check_available().await?;
        Self::check_flag(&self.fail_rental_appends, "rental append").await?;
        let id = record.id;
        self.data.write().await.rentals.push(record);
        Ok(id)
    }

    async fn query_rentals_by_book(&self, book_id: BookId) -> Result<Vec<RentalRecord>> {
        self.check_available().await?;
        let data = self.data.read().await;
        Ok(data
            .rentals
            .iter()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn query_rentals_by_renter(&self, renter: &UserId) -> Result<Vec<RentalRecord>> {
        self.check_available().await?;
        let data = self.data.read().await;
        Ok(data
            .rentals
            .iter()
            .filter(|r| &r.renter_id == renter)
            .cloned()
            .collect())
    }

    async fn append_notification(&self, notification: Notification) -> Result<NotificationId> {
        self.check_available().await?;
        Self::check_flag(&self.fail_notification_appends, "notification append").await?;
        let id = notification.id;
        self.data
            .write()
            .await
            .notifications
            .insert(id, notification.clone());
        self.feed.publish(NotificationChange::Added(notification));
        Ok(id)
    }

    async fn get_notification(&self, id: NotificationId) -> Result<Notification> {
        self.check_available().await?;
        self.data
            .read()
            .await
            .notifications
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::notification_not_found(id))
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<()> {
        self.check_available().await?;
        let recipient = {
            let mut data = self.data.write().await;
            let notification = data
                .notifications
                .get_mut(&id)
                .ok_or_else(|| StorageError::notification_not_found(id))?;
            if notification.read {
                return Ok(());
            }
            notification.read = true;
            notification.recipient.clone()
        };
        self.feed.publish(NotificationChange::Read { id, recipient });
        Ok(())
    }

    async fn list_notifications(&self, recipient: &UserId) -> Result<Vec<Notification>> {
        self.check_available().await?;
        let data = self.data.read().await;
        Ok(data
            .notifications
            .values()
            .filter(|n| &n.recipient == recipient)
            .cloned()
            .collect())
    }

    async fn put_cart_item(&self, item: CartItem) -> Result<()> {
        self.check_available().await?;
        Self::check_flag(&self.fail_cart_writes, "cart write").await?;
        let key = (item.user_id.clone(), item.book_id);
        self.data.write().await.cart.insert(key, item);
        Ok(())
    }

    async fn remove_cart_item(&self, user: &UserId, book_id: BookId) -> Result<()> {
        self.check_available().await?;
        Self::check_flag(&self.fail_cart_writes, "cart write").await?;
        self.data
            .write()
            .await
            .cart
            .shift_remove(&(user.clone(), book_id));
        Ok(())
    }

    async fn clear_cart(&self, user: &UserId) -> Result<()> {
        self.check_available().await?;
        Self::check_flag(&self.fail_cart_writes, "cart write").await?;
        self.data
            .write()
            .await
            .cart
            .retain(|(owner, _), _| owner != user);
        Ok(())
    }

    async fn list_cart_items(&self, user: &UserId) -> Result<Vec<CartItem>> {
        self.check_available().await?;
        let data = self.data.read().await;
        Ok(data
            .cart
            .iter()
            .filter(|((owner, _), _)| owner == user)
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn subscribe_to_notifications(
        &self,
        user: &UserId,
        listener: Arc<dyn NotificationListener>,
    ) -> Result<Subscription> {
        self.check_available().await?;
        Ok(self.feed.subscribe(user, listener))
    }
}
