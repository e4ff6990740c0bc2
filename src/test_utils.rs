//! Test utilities and fixtures.
//!
//! Shared by unit tests, the integration tests (through the `test-utils`
//! feature) and the cucumber world.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use crate::cart::CartManager;
use crate::checkout::{CheckoutOrchestrator, CheckoutRequest};
use crate::config::CheckoutConfig;
use crate::interfaces::catalog_store::Result as StorageResult;
use crate::interfaces::{CatalogStore, NotificationListener, StorageError, Subscription, UserProfile};
use crate::inventory::Inventory;
use crate::library::LibraryView;
use crate::model::{
    Book, BookDetails, BookId, BookPatch, CartItem, Notification, NotificationId, PaymentMethod,
    Price, RentalId, RentalRecord, UserId,
};
use crate::notifications::NotificationDispatcher;
use crate::returns::ReturnDesk;
use crate::session::Session;
use crate::storage::InMemoryCatalogStore;

/// Profile with a display name and email derived from the id.
pub fn profile(id: &str) -> UserProfile {
    let mut name = id.to_string();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    UserProfile::new(id, name, format!("{id}@example.com"))
}

pub fn session(id: &str) -> Session {
    Session::new(profile(id))
}

pub fn details(title: &str, price_minor: u64) -> BookDetails {
    BookDetails::new(title, "Test Author", Price::from_minor(price_minor))
}

/// A valid request: Upi, due in a week.
pub fn request() -> CheckoutRequest {
    CheckoutRequest::new(
        "12 Library Lane",
        PaymentMethod::Upi,
        Utc::now().date_naive() + Duration::days(7),
    )
}

/// Insert an available book owned by `owner`.
pub async fn seed_book(store: &dyn CatalogStore, owner: &str, title: &str, price_minor: u64) -> Book {
    store
        .insert_book(&UserId::new(owner), details(title, price_minor))
        .await
        .expect("seed book")
}

/// Every core service wired to one in-memory store.
pub struct Harness {
    pub store: Arc<InMemoryCatalogStore>,
    pub inventory: Inventory,
    pub dispatcher: NotificationDispatcher,
    pub orchestrator: CheckoutOrchestrator,
    pub returns: ReturnDesk,
    pub library: LibraryView,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_checkout_config(CheckoutConfig::default())
    }

    pub fn with_checkout_config(config: CheckoutConfig) -> Self {
        Self::over(Arc::new(InMemoryCatalogStore::new()), config)
    }

    /// Wire services to `store`, which tests keep for fault injection.
    pub fn over(store: Arc<InMemoryCatalogStore>, config: CheckoutConfig) -> Self {
        let shared: Arc<dyn CatalogStore> = store.clone();
        Self {
            inventory: Inventory::new(shared.clone()),
            dispatcher: NotificationDispatcher::new(shared.clone()),
            orchestrator: CheckoutOrchestrator::new(shared.clone(), config),
            returns: ReturnDesk::new(shared.clone()),
            library: LibraryView::new(shared),
            store,
        }
    }

    pub fn shared_store(&self) -> Arc<dyn CatalogStore> {
        self.store.clone()
    }

    pub async fn seed_book(&self, owner: &str, title: &str, price_minor: u64) -> Book {
        seed_book(self.store.as_ref(), owner, title, price_minor).await
    }

    pub fn cart(&self, user: &str) -> CartManager {
        CartManager::new(session(user), self.shared_store())
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Store that replays races against a live inner store.
///
/// `get_book` can be pinned to an outdated snapshot, and a rival can be set to
/// take the book while a rental record is being appended. Everything else,
/// including the conditional writes, goes to the live inner store, which is
/// how a reader racing other users sees the world.
pub struct RacingStore {
    inner: Arc<InMemoryCatalogStore>,
    snapshots: RwLock<HashMap<BookId, Book>>,
    rival: RwLock<Option<UserId>>,
}

impl RacingStore {
    pub fn new(inner: Arc<InMemoryCatalogStore>) -> Self {
        Self {
            inner,
            snapshots: RwLock::new(HashMap::new()),
            rival: RwLock::new(None),
        }
    }

    /// Serve `book` as-is for every later `get_book` of its id.
    pub async fn pin(&self, book: Book) {
        self.snapshots.write().await.insert(book.id, book);
    }

    /// On the next rental append, the owner takes the book back and `rival`
    /// rents it before the append fails as unavailable.
    pub async fn rival_on_append(&self, rival: UserId) {
        *self.rival.write().await = Some(rival);
    }
}

#[async_trait]
impl CatalogStore for RacingStore {
    async fn get_book(&self, id: BookId) -> StorageResult<Book> {
        if let Some(book) = self.snapshots.read().await.get(&id) {
            return Ok(book.clone());
        }
        self.inner.get_book(id).await
    }

    async fn insert_book(&self, owner: &UserId, details: BookDetails) -> StorageResult<Book> {
        self.inner.insert_book(owner, details).await
    }

    async fn conditional_update_book(
        &self,
        id: BookId,
        expected_available: bool,
        expected_renter: Option<&UserId>,
        patch: BookPatch,
    ) -> StorageResult<Book> {
        self.inner
            .conditional_update_book(id, expected_available, expected_renter, patch)
            .await
    }

    async fn conditional_delete_book(&self, id: BookId, expected_available: bool) -> StorageResult<()> {
        self.inner.conditional_delete_book(id, expected_available).await
    }

    async fn query_books_by_owner(&self, owner: &UserId) -> StorageResult<Vec<Book>> {
        self.inner.query_books_by_owner(owner).await
    }

    async fn query_books_by_renter(&self, renter: &UserId) -> StorageResult<Vec<Book>> {
        self.inner.query_books_by_renter(renter).await
    }

    async fn list_available_books(&self) -> StorageResult<Vec<Book>> {
        self.inner.list_available_books().await
    }

    async fn append_rental_record(&self, record: RentalRecord) -> StorageResult<RentalId> {
        let Some(rival) = self.rival.write().await.take() else {
            return self.inner.append_rental_record(record).await;
        };
        self.inner
            .conditional_update_book(record.book_id, false, None, BookPatch::release(Utc::now()))
            .await?;
        self.inner
            .conditional_update_book(record.book_id, true, None, BookPatch::reserve(rival, Utc::now()))
            .await?;
        Err(StorageError::Unavailable("rental log offline".to_string()))
    }

    async fn query_rentals_by_book(&self, book_id: BookId) -> StorageResult<Vec<RentalRecord>> {
        self.inner.query_rentals_by_book(book_id).await
    }

    async fn query_rentals_by_renter(&self, renter: &UserId) -> StorageResult<Vec<RentalRecord>> {
        self.inner.query_rentals_by_renter(renter).await
    }

    async fn append_notification(&self, notification: Notification) -> StorageResult<NotificationId> {
        self.inner.append_notification(notification).await
    }

    async fn get_notification(&self, id: NotificationId) -> StorageResult<Notification> {
        self.inner.get_notification(id).await
    }

    async fn mark_notification_read(&self, id: NotificationId) -> StorageResult<()> {
        self.inner.mark_notification_read(id).await
    }

    async fn list_notifications(&self, recipient: &UserId) -> StorageResult<Vec<Notification>> {
        self.inner.list_notifications(recipient).await
    }

    async fn put_cart_item(&self, item: CartItem) -> StorageResult<()> {
        self.inner.put_cart_item(item).await
    }

    async fn remove_cart_item(&self, user: &UserId, book_id: BookId) -> StorageResult<()> {
        self.inner.remove_cart_item(user, book_id).await
    }

    async fn clear_cart(&self, user: &UserId) -> StorageResult<()> {
        self.inner.clear_cart(user).await
    }

    async fn list_cart_items(&self, user: &UserId) -> StorageResult<Vec<CartItem>> {
        self.inner.list_cart_items(user).await
    }

    async fn subscribe_to_notifications(
        &self,
        user: &UserId,
        listener: Arc<dyn NotificationListener>,
    ) -> StorageResult<Subscription> {
        self.inner.subscribe_to_notifications(user, listener).await
    }
}
