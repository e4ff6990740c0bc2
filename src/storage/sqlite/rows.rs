//! Row decoding for the SQLite catalog store.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::interfaces::catalog_store::{Result, StorageError};
use crate::model::{Book, CartItem, Notification, Price, RentalRecord, UserId};

/// Fixed-width RFC 3339, so stored timestamps also sort as text.
pub(super) fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse<T>(collection: &'static str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e: T::Err| StorageError::Corrupt {
        collection,
        reason: format!("{raw:?}: {e}"),
    })
}

fn parse_ts(collection: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt {
            collection,
            reason: format!("timestamp {raw:?}: {e}"),
        })
}

fn parse_opt_ts(collection: &'static str, raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|raw| parse_ts(collection, &raw)).transpose()
}

/// Prices are stored as signed 64-bit integers.
pub(super) fn stored_price(price: Price) -> Result<i64> {
    i64::try_from(price.minor()).map_err(|_| StorageError::OutOfRange {
        field: "price",
        value: price.minor(),
    })
}

fn price(collection: &'static str, raw: i64) -> Result<Price> {
    u64::try_from(raw)
        .map(Price::from_minor)
        .map_err(|_| StorageError::Corrupt {
            collection,
            reason: format!("negative price {raw}"),
        })
}

pub(super) fn book_from_row(row: &SqliteRow) -> Result<Book> {
    const C: &str = "book";
    Ok(Book {
        id: parse(C, &row.try_get::<String, _>("id")?)?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        description: row.try_get("description")?,
        price: price(C, row.try_get("price")?)?,
        image: row.try_get("image")?,
        owner_id: UserId::new(row.try_get::<String, _>("owner_id")?),
        is_available: row.try_get::<i64, _>("is_available")? != 0,
        rented_by: row
            .try_get::<Option<String>, _>("rented_by")?
            .map(UserId::new),
        rented_at: parse_opt_ts(C, row.try_get("rented_at")?)?,
        last_returned_at: parse_opt_ts(C, row.try_get("last_returned_at")?)?,
        created_at: parse_ts(C, &row.try_get::<String, _>("created_at")?)?,
    })
}

pub(super) fn rental_from_row(row: &SqliteRow) -> Result<RentalRecord> {
    const C: &str = "rental";
    Ok(RentalRecord {
        id: parse(C, &row.try_get::<String, _>("id")?)?,
        renter_id: UserId::new(row.try_get::<String, _>("renter_id")?),
        owner_id: UserId::new(row.try_get::<String, _>("owner_id")?),
        book_id: parse(C, &row.try_get::<String, _>("book_id")?)?,
        book_title: row.try_get("book_title")?,
        price: price(C, row.try_get("price")?)?,
        rented_at: parse_ts(C, &row.try_get::<String, _>("rented_at")?)?,
        return_date: parse::<NaiveDate>(C, &row.try_get::<String, _>("return_date")?)?,
        delivery_address: row.try_get("delivery_address")?,
        payment_method: parse(C, &row.try_get::<String, _>("payment_method")?)?,
        status: parse(C, &row.try_get::<String, _>("status")?)?,
        recorded_at: parse_ts(C, &row.try_get::<String, _>("recorded_at")?)?,
    })
}

pub(super) fn notification_from_row(row: &SqliteRow) -> Result<Notification> {
    const C: &str = "notification";
    Ok(Notification {
        id: parse(C, &row.try_get::<String, _>("id")?)?,
        recipient: UserId::new(row.try_get::<String, _>("recipient")?),
        message: row.try_get("message")?,
        kind: parse(C, &row.try_get::<String, _>("kind")?)?,
        book_id: parse(C, &row.try_get::<String, _>("book_id")?)?,
        rental_at: parse_ts(C, &row.try_get::<String, _>("rental_at")?)?,
        created_at: parse_ts(C, &row.try_get::<String, _>("created_at")?)?,
        read: row.try_get::<i64, _>("read")? != 0,
    })
}

pub(super) fn cart_item_from_row(row: &SqliteRow) -> Result<CartItem> {
    const C: &str = "cart item";
    Ok(CartItem {
        user_id: UserId::new(row.try_get::<String, _>("user_id")?),
        book_id: parse(C, &row.try_get::<String, _>("book_id")?)?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        image: row.try_get("image")?,
        price: price(C, row.try_get("price")?)?,
        added_at: parse_ts(C, &row.try_get::<String, _>("added_at")?)?,
    })
}
