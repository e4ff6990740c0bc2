//! Book records and the patches that move them between states.

use std::fmt;
use std::iter::Sum;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, UserId};
use crate::error::ValidationError;

/// Non-negative amount in minor currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    pub const ZERO: Price = Price(0);
    /// Largest price a catalog store is required to hold.
    pub const MAX: Price = Price(i64::MAX as u64);

    pub fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    pub fn minor(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Self {
        Price(iter.fold(0u64, |acc, p| acc.saturating_add(p.0)))
    }
}

/// Availability state derived from a book's stored fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookState {
    /// Book can be rented.
    Available,
    /// Book is rented by a user.
    Rented { by: UserId },
}

/// A lendable book as held by the catalog store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: Price,
    pub image: Option<String>,
    pub owner_id: UserId,
    pub is_available: bool,
    pub rented_by: Option<UserId>,
    pub rented_at: Option<DateTime<Utc>>,
    pub last_returned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Build a freshly listed, available book.
    pub fn listed(id: BookId, owner_id: UserId, details: BookDetails, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: details.title,
            author: details.author,
            description: details.description,
            price: details.price,
            image: details.image,
            owner_id,
            is_available: true,
            rented_by: None,
            rented_at: None,
            last_returned_at: None,
            created_at: now,
        }
    }

    pub fn state(&self) -> BookState {
        match (&self.rented_by, self.is_available) {
            (Some(by), false) => BookState::Rented { by: by.clone() },
            _ => BookState::Available,
        }
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner_id == user
    }

    pub fn details(&self) -> BookDetails {
        BookDetails {
            title: self.title.clone(),
            author: self.author.clone(),
            description: self.description.clone(),
            price: self.price,
            image: self.image.clone(),
        }
    }
}

/// Owner-editable part of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub image: Option<String>,
}

impl BookDetails {
    pub fn new(title: impl Into<String>, author: impl Into<String>, price: Price) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            description: String::new(),
            price,
            image: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Title and author are required; the price must fit in [`Price::MAX`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if self.author.trim().is_empty() {
            return Err(ValidationError::MissingAuthor);
        }
        if self.price > Price::MAX {
            return Err(ValidationError::PriceTooLarge { price: self.price });
        }
        Ok(())
    }
}

/// Field changes carried by a conditional book update.
///
/// `None` leaves a field untouched. For nullable fields the inner option is the
/// new value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookPatch {
    pub is_available: Option<bool>,
    pub rented_by: Option<Option<UserId>>,
    pub rented_at: Option<Option<DateTime<Utc>>>,
    pub last_returned_at: Option<DateTime<Utc>>,
    pub details: Option<BookDetails>,
}

impl BookPatch {
    /// Available -> Rented by `renter`.
    pub fn reserve(renter: UserId, at: DateTime<Utc>) -> Self {
        Self {
            is_available: Some(false),
            rented_by: Some(Some(renter)),
            rented_at: Some(Some(at)),
            ..Self::default()
        }
    }

    /// Rented -> Available, stamping the return time.
    pub fn release(at: DateTime<Utc>) -> Self {
        Self {
            last_returned_at: Some(at),
            ..Self::unwind()
        }
    }

    /// Rented -> Available without recording a return. Used to undo a
    /// reservation whose rental could not be recorded.
    pub fn unwind() -> Self {
        Self {
            is_available: Some(true),
            rented_by: Some(None),
            rented_at: Some(None),
            ..Self::default()
        }
    }

    pub fn details(details: BookDetails) -> Self {
        Self {
            details: Some(details),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, book: &mut Book) {
        if let Some(available) = self.is_available {
            book.is_available = available;
        }
        if let Some(rented_by) = &self.rented_by {
            book.rented_by = rented_by.clone();
        }
        if let Some(rented_at) = self.rented_at {
            book.rented_at = rented_at;
        }
        if let Some(returned_at) = self.last_returned_at {
            book.last_returned_at = Some(returned_at);
        }
        if let Some(details) = &self.details {
            book.title = details.title.clone();
            book.author = details.author.clone();
            book.description = details.description.clone();
            book.price = details.price;
            book.image = details.image.clone();
        }
    }
}
