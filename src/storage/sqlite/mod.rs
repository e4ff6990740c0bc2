//! SQLite implementation of the catalog store.
//!
//! Conditional book operations are a single `UPDATE ... WHERE id = ? AND
//! is_available = ?` (or `DELETE`), so SQLite's statement atomicity is the
//! compare-and-set. Timestamps are stored as RFC 3339 text with nanosecond
//! precision, booleans as 0/1 integers.

mod rows;

use std::sync::Arc;

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Order, Query, SimpleExpr, SqliteQueryBuilder};
use sqlx::SqlitePool;
use tracing::debug;

use self::rows::{
    book_from_row, cart_item_from_row, notification_from_row, rental_from_row, stored_price, ts,
};
use super::feed::NotificationFeed;
use super::schema::{Books, CartItems, Notifications, Rentals, CREATE_CATALOG_TABLES};
use crate::interfaces::catalog_store::{CatalogStore, Result, StorageError};
use crate::interfaces::{NotificationListener, Subscription};
use crate::model::{
    Book, BookDetails, BookId, BookPatch, CartItem, Notification, NotificationChange,
    NotificationId, RentalId, RentalRecord, UserId,
};

/// SQLite implementation of CatalogStore.
pub struct SqliteCatalogStore {
    pool: SqlitePool,
    feed: NotificationFeed,
}

impl SqliteCatalogStore {
    /// Create a new SQLite catalog store.
    pub fn new(pool: SqlitePool, feed: NotificationFeed) -> Self {
        Self { pool, feed }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_CATALOG_TABLES)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn book_exists(&self, id: BookId) -> Result<bool> {
        let query = Query::select()
            .column(Books::Id)
            .from(Books::Table)
            .and_where(Expr::col(Books::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        Ok(sqlx::query(&query)
            .fetch_optional(&self.pool)
            .await?
            .is_some())
    }

    /// Distinguish a failed guard from a missing row after a conditional
    /// statement touched nothing.
    async fn guard_failure(&self, id: BookId, expected_available: bool) -> Result<StorageError> {
        if self.book_exists(id).await? {
            Ok(StorageError::PreconditionFailed {
                book_id: id,
                expected: expected_available,
            })
        } else {
            Ok(StorageError::book_not_found(id))
        }
    }

    async fn fetch_books(&self, query: String) -> Result<Vec<Book>> {
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(book_from_row).collect()
    }

    async fn fetch_rentals(&self, query: String) -> Result<Vec<RentalRecord>> {
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(rental_from_row).collect()
    }
}

// sea-query expressions are not `Send`, so every statement is rendered to a
// string before the first await.

fn select_books_query(filter: Option<SimpleExpr>) -> String {
    let mut select = Query::select();
    select.columns(Books::COLUMNS).from(Books::Table);
    if let Some(filter) = filter {
        select.and_where(filter);
    }
    select
        .order_by_expr(Expr::cust("rowid"), Order::Asc)
        .to_string(SqliteQueryBuilder)
}

fn select_rentals_query(filter: SimpleExpr) -> String {
    Query::select()
        .columns(Rentals::COLUMNS)
        .from(Rentals::Table)
        .and_where(filter)
        .order_by_expr(Expr::cust("rowid"), Order::Asc)
        .to_string(SqliteQueryBuilder)
}

fn patch_values(patch: &BookPatch) -> Result<Vec<(Books, SimpleExpr)>> {
    let mut values = Vec::new();
    if let Some(available) = patch.is_available {
        values.push((Books::IsAvailable, i64::from(available).into()));
    }
    if let Some(rented_by) = &patch.rented_by {
        let rented_by: Option<String> = rented_by.as_ref().map(ToString::to_string);
        values.push((Books::RentedBy, rented_by.into()));
    }
    if let Some(rented_at) = &patch.rented_at {
        values.push((Books::RentedAt, rented_at.as_ref().map(ts).into()));
    }
    if let Some(returned_at) = &patch.last_returned_at {
        values.push((Books::LastReturnedAt, ts(returned_at).into()));
    }
    if let Some(details) = &patch.details {
        values.push((Books::Title, details.title.clone().into()));
        values.push((Books::Author, details.author.clone().into()));
        values.push((Books::Description, details.description.clone().into()));
        values.push((Books::Price, stored_price(details.price)?.into()));
        values.push((Books::Image, details.image.clone().into()));
    }
    Ok(values)
}

/// Guarded `UPDATE ... RETURNING`, or `None` when the patch changes nothing.
fn update_book_query(
    id: BookId,
    expected_available: bool,
    expected_renter: Option<&UserId>,
    patch: &BookPatch,
) -> Result<Option<String>> {
    let values = patch_values(patch)?;
    if values.is_empty() {
        return Ok(None);
    }

    let mut update = Query::update();
    update
        .table(Books::Table)
        .values(values)
        .and_where(Expr::col(Books::Id).eq(id.to_string()))
        .and_where(Expr::col(Books::IsAvailable).eq(i64::from(expected_available)));
    if let Some(renter) = expected_renter {
        update.and_where(Expr::col(Books::RentedBy).eq(renter.as_str()));
    }
    Ok(Some(
        update
            .returning(Query::returning().columns(Books::COLUMNS))
            .to_string(SqliteQueryBuilder),
    ))
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn get_book(&self, id: BookId) -> Result<Book> {
        let query = select_books_query(Some(Expr::col(Books::Id).eq(id.to_string())));
        self.fetch_books(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::book_not_found(id))
    }

    async fn insert_book(&self, owner: &UserId, details: BookDetails) -> Result<Book> {
        let book = Book::listed(BookId::new(), owner.clone(), details, chrono::Utc::now());
        let price = stored_price(book.price)?;

        let query = Query::insert()
            .into_table(Books::Table)
            .columns(Books::COLUMNS)
            .values_panic([
                book.id.to_string().into(),
                book.title.clone().into(),
                book.author.clone().into(),
                book.description.clone().into(),
                price.into(),
                book.image.clone().into(),
                book.owner_id.to_string().into(),
                i64::from(book.is_available).into(),
                None::<String>.into(),
                None::<String>.into(),
                None::<String>.into(),
                ts(&book.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        debug!(book_id = %book.id, owner_id = %owner, "Book inserted");
        Ok(book)
    }

    async fn conditional_update_book(
        &self,
        id: BookId,
        expected_available: bool,
        expected_renter: Option<&UserId>,
        patch: BookPatch,
    ) -> Result<Book> {
        let Some(query) = update_book_query(id, expected_available, expected_renter, &patch)? else {
            let book = self.get_book(id).await?;
            let renter_matches = expected_renter.map_or(true, |r| book.rented_by.as_ref() == Some(r));
            if book.is_available != expected_available || !renter_matches {
                return Err(StorageError::PreconditionFailed {
                    book_id: id,
                    expected: expected_available,
                });
            }
            return Ok(book);
        };

        match sqlx::query(&query).fetch_optional(&self.pool).await? {
            Some(row) => book_from_row(&row),
            None => Err(self.guard_failure(id, expected_available).await?),
        }
    }

    async fn conditional_delete_book(&self, id: BookId, expected_available: bool) -> Result<()> {
        let query = Query::delete()
            .from_table(Books::Table)
            .and_where(Expr::col(Books::Id).eq(id.to_string()))
            .and_where(Expr::col(Books::IsAvailable).eq(i64::from(expected_available)))
            .to_string(SqliteQueryBuilder);

        let affected = sqlx::query(&query)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(self.guard_failure(id, expected_available).await?);
        }
        Ok(())
    }

    async fn query_books_by_owner(&self, owner: &UserId) -> Result<Vec<Book>> {
        let query = select_books_query(Some(Expr::col(Books::OwnerId).eq(owner.as_str())));
        self.fetch_books(query).await
    }

    async fn query_books_by_renter(&self, renter: &UserId) -> Result<Vec<Book>> {
        let query = select_books_query(Some(Expr::col(Books::RentedBy).eq(renter.as_str())));
        self.fetch_books(query).await
    }

    async fn list_available_books(&self) -> Result<Vec<Book>> {
        let query = select_books_query(Some(Expr::col(Books::IsAvailable).eq(1i64)));
        self.fetch_books(query).await
    }

    async fn append_rental_record(&self, record: RentalRecord) -> Result<RentalId> {
        let price = stored_price(record.price)?;
        let query = Query::insert()
            .into_table(Rentals::Table)
            .columns(Rentals::COLUMNS)
            .values_panic([
                record.id.to_string().into(),
                record.renter_id.to_string().into(),
                record.owner_id.to_string().into(),
                record.book_id.to_string().into(),
                record.book_title.clone().into(),
                price.into(),
                ts(&record.rented_at).into(),
                record.return_date.to_string().into(),
                record.delivery_address.clone().into(),
                record.payment_method.as_str().into(),
                record.status.as_str().into(),
                ts(&record.recorded_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(record.id)
    }

    async fn query_rentals_by_book(&self, book_id: BookId) -> Result<Vec<RentalRecord>> {
        let query = select_rentals_query(Expr::col(Rentals::BookId).eq(book_id.to_string()));
        self.fetch_rentals(query).await
    }

    async fn query_rentals_by_renter(&self, renter: &UserId) -> Result<Vec<RentalRecord>> {
        let query = select_rentals_query(Expr::col(Rentals::RenterId).eq(renter.as_str()));
        self.fetch_rentals(query).await
    }

    async fn append_notification(&self, notification: Notification) -> Result<NotificationId> {
        let query = Query::insert()
            .into_table(Notifications::Table)
            .columns(Notifications::COLUMNS)
            .values_panic([
                notification.id.to_string().into(),
                notification.recipient.to_string().into(),
                notification.message.clone().into(),
                notification.kind.as_str().into(),
                notification.book_id.to_string().into(),
                ts(&notification.rental_at).into(),
                ts(&notification.created_at).into(),
                i64::from(notification.read).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        let id = notification.id;
        self.feed.publish(NotificationChange::Added(notification));
        Ok(id)
    }

    async fn get_notification(&self, id: NotificationId) -> Result<Notification> {
        let query = Query::select()
            .columns(Notifications::COLUMNS)
            .from(Notifications::Table)
            .and_where(Expr::col(Notifications::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        match sqlx::query(&query).fetch_optional(&self.pool).await? {
            Some(row) => notification_from_row(&row),
            None => Err(StorageError::notification_not_found(id)),
        }
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<()> {
        let query = Query::update()
            .table(Notifications::Table)
            .value(Notifications::Read, 1i64)
            .and_where(Expr::col(Notifications::Id).eq(id.to_string()))
            .and_where(Expr::col(Notifications::Read).eq(0i64))
            .returning(Query::returning().columns(Notifications::COLUMNS))
            .to_string(SqliteQueryBuilder);

        match sqlx::query(&query).fetch_optional(&self.pool).await? {
            Some(row) => {
                let notification = notification_from_row(&row)?;
                self.feed.publish(NotificationChange::Read {
                    id,
                    recipient: notification.recipient,
                });
                Ok(())
            }
            // Already read, or missing.
            None => self.get_notification(id).await.map(|_| ()),
        }
    }

    async fn list_notifications(&self, recipient: &UserId) -> Result<Vec<Notification>> {
        let query = Query::select()
            .columns(Notifications::COLUMNS)
            .from(Notifications::Table)
            .and_where(Expr::col(Notifications::Recipient).eq(recipient.as_str()))
            .order_by_expr(Expr::cust("rowid"), Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(notification_from_row).collect()
    }

    async fn put_cart_item(&self, item: CartItem) -> Result<()> {
        let price = stored_price(item.price)?;
        // Upsert keeps the original rowid, which preserves first-insertion order.
        let query = Query::insert()
            .into_table(CartItems::Table)
            .columns(CartItems::COLUMNS)
            .values_panic([
                item.user_id.to_string().into(),
                item.book_id.to_string().into(),
                item.title.clone().into(),
                item.author.clone().into(),
                item.image.clone().into(),
                price.into(),
                ts(&item.added_at).into(),
            ])
            .on_conflict(
                OnConflict::columns([CartItems::UserId, CartItems::BookId])
                    .update_columns([
                        CartItems::Title,
                        CartItems::Author,
                        CartItems::Image,
                        CartItems::Price,
                        CartItems::AddedAt,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn remove_cart_item(&self, user: &UserId, book_id: BookId) -> Result<()> {
        let query = Query::delete()
            .from_table(CartItems::Table)
            .and_where(Expr::col(CartItems::UserId).eq(user.as_str()))
            .and_where(Expr::col(CartItems::BookId).eq(book_id.to_string()))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn clear_cart(&self, user: &UserId) -> Result<()> {
        let query = Query::delete()
            .from_table(CartItems::Table)
            .and_where(Expr::col(CartItems::UserId).eq(user.as_str()))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_cart_items(&self, user: &UserId) -> Result<Vec<CartItem>> {
        let query = Query::select()
            .columns(CartItems::COLUMNS)
            .from(CartItems::Table)
            .and_where(Expr::col(CartItems::UserId).eq(user.as_str()))
            .order_by_expr(Expr::cust("rowid"), Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(cart_item_from_row).collect()
    }

    async fn subscribe_to_notifications(
        &self,
        user: &UserId,
        listener: Arc<dyn NotificationListener>,
    ) -> Result<Subscription> {
        Ok(self.feed.subscribe(user, listener))
    }
}

#[cfg(test)]
mod tests;
