//! Rental audit records and payment choices.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Book, BookId, Price, RentalId, UserId};

/// How the renter intends to pay. Recorded only; settlement happens elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    Upi,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cash_on_delivery",
            Self::Upi => "upi",
            Self::Card => "card",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown payment method: {0}")]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cod" | "cash_on_delivery" | "cash-on-delivery" => Ok(Self::CashOnDelivery),
            "upi" => Ok(Self::Upi),
            "card" => Ok(Self::Card),
            other => Err(UnknownPaymentMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Rented,
    Returned,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rented => "rented",
            Self::Returned => "returned",
        }
    }
}

impl FromStr for RentalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rented" => Ok(Self::Rented),
            "returned" => Ok(Self::Returned),
            other => Err(format!("unknown rental status: {other}")),
        }
    }
}

/// Append-only audit entry for one rental transition.
///
/// A rental is recorded once with [`RentalStatus::Rented`]; a return appends a
/// second entry with [`RentalStatus::Returned`] rather than editing the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalRecord {
    pub id: RentalId,
    pub renter_id: UserId,
    pub owner_id: UserId,
    pub book_id: BookId,
    pub book_title: String,
    pub price: Price,
    pub rented_at: DateTime<Utc>,
    pub return_date: NaiveDate,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
    pub status: RentalStatus,
    pub recorded_at: DateTime<Utc>,
}

impl RentalRecord {
    /// Record for a book that was just reserved by `renter_id`.
    pub fn rented(
        book: &Book,
        renter_id: UserId,
        rented_at: DateTime<Utc>,
        return_date: NaiveDate,
        delivery_address: &str,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            id: RentalId::new(),
            renter_id,
            owner_id: book.owner_id.clone(),
            book_id: book.id,
            book_title: book.title.clone(),
            price: book.price,
            rented_at,
            return_date,
            delivery_address: delivery_address.to_string(),
            payment_method,
            status: RentalStatus::Rented,
            recorded_at: rented_at,
        }
    }

    /// Companion entry closing this rental.
    pub fn returned(&self, returned_at: DateTime<Utc>) -> Self {
        Self {
            id: RentalId::new(),
            status: RentalStatus::Returned,
            recorded_at: returned_at,
            ..self.clone()
        }
    }
}
