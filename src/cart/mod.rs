//! Cart manager.
//!
//! A session-scoped, insertion-ordered set of cart items for one user. Local
//! state is authoritative; every change is mirrored to the catalog store on a
//! best-effort basis so another device can restore the cart.

use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::RentalError;
use crate::interfaces::{CatalogStore, StorageError};
use crate::model::{Book, BookId, CartItem, Price};
use crate::session::Session;

/// What `CartManager::add` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// The book was already present; its item was refreshed in place.
    Replaced,
    /// The session user owns the book. Nothing changed.
    RejectedOwnBook,
}

/// One user's cart.
pub struct CartManager {
    session: Session,
    store: Arc<dyn CatalogStore>,
    items: IndexMap<BookId, CartItem>,
}

impl CartManager {
    /// Empty cart for `session`.
    pub fn new(session: Session, store: Arc<dyn CatalogStore>) -> Self {
        Self {
            session,
            store,
            items: IndexMap::new(),
        }
    }

    /// Rebuild the cart from the store mirror.
    ///
    /// Mirrored items for books the user owns are dropped, so the own-book
    /// exclusion also holds for carts written by older clients.
    pub async fn restore(session: Session, store: Arc<dyn CatalogStore>) -> Result<Self, RentalError> {
        let mirrored = store.list_cart_items(session.user_id()).await?;
        let mut cart = Self::new(session, store);

        for item in mirrored {
            match cart.store.get_book(item.book_id).await {
                Ok(book) if book.is_owned_by(cart.session.user_id()) => {
                    warn!(book_id = %item.book_id, user_id = %cart.session.user_id(), "Dropping own book from restored cart");
                    cart.mirror_remove(item.book_id).await;
                    continue;
                }
                Ok(_) | Err(StorageError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
            cart.items.insert(item.book_id, item);
        }

        debug!(user_id = %cart.session.user_id(), items = cart.items.len(), "Cart restored");
        Ok(cart)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Insert or replace the item for `book`, keeping its original position.
    pub async fn add(&mut self, book: &Book) -> AddOutcome {
        if book.is_owned_by(self.session.user_id()) {
            debug!(book_id = %book.id, user_id = %self.session.user_id(), "Own book not added to cart");
            return AddOutcome::RejectedOwnBook;
        }

        let item = CartItem::for_book(self.session.user_id().clone(), book, Utc::now());
        let outcome = match self.items.insert(book.id, item.clone()) {
            Some(_) => AddOutcome::Replaced,
            None => AddOutcome::Added,
        };

        if let Err(e) = self.store.put_cart_item(item).await {
            warn!(book_id = %book.id, user_id = %self.session.user_id(), error = %e, "Failed to mirror cart add");
        }
        outcome
    }

    /// Remove the item for `book_id`. Returns whether it was present.
    pub async fn remove(&mut self, book_id: BookId) -> bool {
        if self.items.shift_remove(&book_id).is_none() {
            return false;
        }
        self.mirror_remove(book_id).await;
        true
    }

    /// Remove several items, keeping the order of the rest.
    pub async fn remove_many(&mut self, book_ids: &[BookId]) -> usize {
        let mut removed = 0;
        for book_id in book_ids {
            if self.remove(*book_id).await {
                removed += 1;
            }
        }
        removed
    }

    pub async fn clear(&mut self) {
        self.items.clear();
        if let Err(e) = self.store.clear_cart(self.session.user_id()).await {
            warn!(user_id = %self.session.user_id(), error = %e, "Failed to mirror cart clear");
        }
    }

    pub fn total(&self) -> Price {
        self.items.values().map(|item| item.price).sum()
    }

    /// Items in insertion order.
    pub fn items(&self) -> impl ExactSizeIterator<Item = &CartItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, book_id: BookId) -> bool {
        self.items.contains_key(&book_id)
    }

    async fn mirror_remove(&self, book_id: BookId) {
        if let Err(e) = self.store.remove_cart_item(self.session.user_id(), book_id).await {
            warn!(book_id = %book_id, user_id = %self.session.user_id(), error = %e, "Failed to mirror cart removal");
        }
    }
}

#[cfg(test)]
mod tests;
