//! Read-side views over the catalog: a user's listings, current rentals,
//! rental history, and the browsable catalog.

use std::sync::Arc;

use crate::error::RentalError;
use crate::interfaces::CatalogStore;
use crate::model::{Book, RentalRecord, RentalStatus};
use crate::session::Session;

/// Ordering for book lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookSort {
    /// Most recently listed first.
    #[default]
    Newest,
    /// Title, case-insensitive, A to Z.
    Title,
}

impl BookSort {
    pub fn apply(self, books: &mut [Book]) {
        match self {
            Self::Newest => books.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Self::Title => books.sort_by_cached_key(|b| b.title.to_lowercase()),
        }
    }
}

#[derive(Clone)]
pub struct LibraryView {
    store: Arc<dyn CatalogStore>,
}

impl LibraryView {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Books listed by the session user.
    pub async fn my_books(&self, session: &Session, sort: BookSort) -> Result<Vec<Book>, RentalError> {
        let mut books = self.store.query_books_by_owner(session.user_id()).await?;
        sort.apply(&mut books);
        Ok(books)
    }

    /// Books the session user is renting right now.
    pub async fn currently_rented(&self, session: &Session, sort: BookSort) -> Result<Vec<Book>, RentalError> {
        let mut books = self.store.query_books_by_renter(session.user_id()).await?;
        books.retain(|b| !b.is_available);
        sort.apply(&mut books);
        Ok(books)
    }

    /// Completed rentals of the session user, most recent return first.
    pub async fn rental_history(&self, session: &Session) -> Result<Vec<RentalRecord>, RentalError> {
        let mut records = self.store.query_rentals_by_renter(session.user_id()).await?;
        records.retain(|r| r.status == RentalStatus::Returned);
        records.reverse();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(records)
    }

    /// Available books the session user could rent, in store order.
    pub async fn browse(&self, session: &Session) -> Result<Vec<Book>, RentalError> {
        let mut books = self.store.list_available_books().await?;
        books.retain(|b| !b.is_owned_by(session.user_id()));
        Ok(books)
    }
}
