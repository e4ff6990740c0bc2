use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Book, BookId, Price, UserId};

/// A book a user intends to rent, with display fields copied from the book.
///
/// Availability is never read from here; checkout re-fetches the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub user_id: UserId,
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub image: Option<String>,
    pub price: Price,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn for_book(user_id: UserId, book: &Book, added_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            book_id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            image: book.image.clone(),
            price: book.price,
            added_at,
        }
    }
}
