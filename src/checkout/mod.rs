//! Checkout orchestrator.
//!
//! Turns a cart, or a single book, plus delivery and payment choices into
//! per-item rental transitions. Items are processed one at a time in the
//! order presented and the batch is not all-or-nothing: every item either
//! commits fully (reservation, rental record, notifications) or is reported
//! as skipped with its reason. Only committed items leave the cart.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::cart::CartManager;
use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, RentalError, ValidationError};
use crate::interfaces::{CatalogStore, StorageError};
use crate::inventory::Inventory;
use crate::model::{Book, BookId, BookPatch, CartItem, PaymentMethod, Price, RentalId, RentalRecord, UserId};
use crate::notifications::NotificationDispatcher;
use crate::session::Session;

/// Delivery and payment choices for one checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
    /// Expected return date.
    pub return_date: NaiveDate,
}

impl CheckoutRequest {
    pub fn new(delivery_address: impl Into<String>, payment_method: PaymentMethod, return_date: NaiveDate) -> Self {
        Self {
            delivery_address: delivery_address.into(),
            payment_method,
            return_date,
        }
    }

    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        if self.delivery_address.trim().is_empty() {
            return Err(ValidationError::MissingAddress);
        }
        if self.return_date < today {
            return Err(ValidationError::ReturnDateInPast {
                return_date: self.return_date,
                today,
            });
        }
        Ok(())
    }
}

/// Why an item was not rented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Rented by someone else, seen on re-fetch or lost at commit.
    ItemUnavailable,
    NotFound,
    OwnBook,
    /// A store failure. Any reservation taken for the item was undone.
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ItemUnavailable => f.write_str("already rented"),
            Self::NotFound => f.write_str("no longer listed"),
            Self::OwnBook => f.write_str("you own this book"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub book_id: BookId,
    pub title: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RentedItem {
    pub book_id: BookId,
    pub title: String,
    pub price: Price,
    pub rental_id: RentalId,
    pub rented_at: DateTime<Utc>,
    /// How many of the owner/renter notifications were stored.
    pub notifications_delivered: usize,
}

/// Outcome of a checkout in which at least one item was rented.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckoutReport {
    pub rented: Vec<RentedItem>,
    pub skipped: Vec<SkippedItem>,
}

impl CheckoutReport {
    /// Sum of the prices of rented items.
    pub fn total(&self) -> Price {
        self.rented.iter().map(|item| item.price).sum()
    }
}

/// One book to attempt, with the title known to the caller.
#[derive(Debug, Clone)]
struct CheckoutLine {
    book_id: BookId,
    title: String,
}

impl From<&CartItem> for CheckoutLine {
    fn from(item: &CartItem) -> Self {
        Self {
            book_id: item.book_id,
            title: item.title.clone(),
        }
    }
}

/// Marks a user's checkout as running until dropped.
struct InFlight<'a> {
    users: &'a Mutex<HashSet<UserId>>,
    user: UserId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user);
    }
}

/// Runs checkouts against the catalog store.
pub struct CheckoutOrchestrator {
    store: Arc<dyn CatalogStore>,
    inventory: Inventory,
    dispatcher: NotificationDispatcher,
    config: CheckoutConfig,
    in_flight: Mutex<HashSet<UserId>>,
}

impl CheckoutOrchestrator {
    pub fn new(store: Arc<dyn CatalogStore>, config: CheckoutConfig) -> Self {
        Self {
            inventory: Inventory::new(store.clone()),
            dispatcher: NotificationDispatcher::new(store.clone()),
            store,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Check out every item in `cart`, in cart order.
    ///
    /// Rented items are removed from the cart; skipped ones stay. The cart
    /// must belong to the session's user.
    #[tracing::instrument(name = "checkout.cart", skip_all, fields(user_id = %session.user_id(), items = cart.len()))]
    pub async fn checkout_cart(
        &self,
        session: &Session,
        cart: &mut CartManager,
        request: &CheckoutRequest,
    ) -> Result<CheckoutReport, CheckoutError> {
        let cart_user = cart.session().user_id();
        if cart_user != session.user_id() {
            warn!(cart_user = %cart_user, "Cart belongs to another user");
            return Err(ValidationError::CartOwnerMismatch {
                cart_user: cart_user.clone(),
                session_user: session.user_id().clone(),
            }
            .into());
        }
        let lines = cart.items().map(CheckoutLine::from).collect();
        self.run(session, lines, request, Some(cart)).await
    }

    /// "Rent Now": check out one book without touching any cart.
    #[tracing::instrument(name = "checkout.rent_now", skip_all, fields(user_id = %session.user_id(), book_id = %book_id))]
    pub async fn rent_now(
        &self,
        session: &Session,
        book_id: BookId,
        request: &CheckoutRequest,
    ) -> Result<CheckoutReport, CheckoutError> {
        // The title is unknown until the book is read; a skip before then
        // reports the id.
        let line = CheckoutLine {
            book_id,
            title: book_id.to_string(),
        };
        self.run(session, vec![line], request, None).await
    }

    fn begin(&self, user: &UserId) -> Result<InFlight<'_>, CheckoutError> {
        let mut users = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !users.insert(user.clone()) {
            warn!(user_id = %user, "Checkout already in progress");
            return Err(CheckoutError::AlreadyInProgress);
        }
        Ok(InFlight {
            users: &self.in_flight,
            user: user.clone(),
        })
    }

    fn validate(&self, lines: &[CheckoutLine], request: &CheckoutRequest) -> Result<(), ValidationError> {
        request.validate(Utc::now().date_naive())?;
        if lines.is_empty() {
            return Err(ValidationError::EmptyCheckout);
        }
        let limit = self.config.max_items;
        if limit > 0 && lines.len() > limit {
            return Err(ValidationError::TooManyItems {
                count: lines.len(),
                limit,
            });
        }
        Ok(())
    }

    /// Shared path for cart checkout (`cart` is `Some`) and single-book rental.
    async fn run(
        &self,
        session: &Session,
        lines: Vec<CheckoutLine>,
        request: &CheckoutRequest,
        mut cart: Option<&mut CartManager>,
    ) -> Result<CheckoutReport, CheckoutError> {
        self.validate(&lines, request)?;
        let _guard = self.begin(session.user_id())?;
        let single_book = cart.is_none();

        let mut report = CheckoutReport::default();
        for line in lines {
            match self.process_line(session, line, request).await {
                Ok(rented) => {
                    if let Some(cart) = cart.as_deref_mut() {
                        cart.remove(rented.book_id).await;
                    }
                    report.rented.push(rented);
                }
                Err(skipped) => {
                    warn!(book_id = %skipped.book_id, reason = %skipped.reason, "Checkout item skipped");
                    report.skipped.push(skipped);
                }
            }
        }

        if report.rented.is_empty() {
            warn!(single_book, skipped = report.skipped.len(), "Nothing could be rented");
            return Err(CheckoutError::NothingRentable {
                skipped: report.skipped,
            });
        }

        info!(
            single_book,
            rented = report.rented.len(),
            skipped = report.skipped.len(),
            total = %report.total(),
            "Checkout completed"
        );
        Ok(report)
    }

    async fn process_line(
        &self,
        session: &Session,
        line: CheckoutLine,
        request: &CheckoutRequest,
    ) -> Result<RentedItem, SkippedItem> {
        let renter = session.user_id();
        let skip = |title: &str, reason: SkipReason| SkippedItem {
            book_id: line.book_id,
            title: title.to_string(),
            reason,
        };

        let book = match self.inventory.get_book(line.book_id).await {
            Ok(book) => book,
            Err(RentalError::NotFound { .. }) => return Err(skip(&line.title, SkipReason::NotFound)),
            Err(e) => return Err(skip(&line.title, SkipReason::Failed(e.to_string()))),
        };
        if book.is_owned_by(renter) {
            return Err(skip(&book.title, SkipReason::OwnBook));
        }
        if !book.is_available {
            return Err(skip(&book.title, SkipReason::ItemUnavailable));
        }

        let reserved = match self.inventory.try_reserve(book.id, renter).await {
            Ok(reserved) => reserved,
            Err(e) => {
                let reason = match e {
                    RentalError::Conflict { .. } => SkipReason::ItemUnavailable,
                    RentalError::NotFound { .. } => SkipReason::NotFound,
                    RentalError::OwnershipViolation { .. } => SkipReason::OwnBook,
                    other => SkipReason::Failed(other.to_string()),
                };
                return Err(skip(&book.title, reason));
            }
        };
        let rented_at = reserved.rented_at.unwrap_or_else(Utc::now);

        let record = RentalRecord::rented(
            &reserved,
            renter.clone(),
            rented_at,
            request.return_date,
            &request.delivery_address,
            request.payment_method,
        );
        let rental_id = match self.store.append_rental_record(record).await {
            Ok(id) => id,
            Err(e) => {
                error!(book_id = %reserved.id, user_id = %renter, error = %e, "Failed to record rental");
                self.unwind(&reserved, renter).await;
                return Err(skip(&reserved.title, SkipReason::Failed(e.to_string())));
            }
        };

        let notifications_delivered = self
            .dispatcher
            .notify_rental(&reserved, session.user(), &request.delivery_address, request.return_date, rented_at)
            .await;

        info!(book_id = %reserved.id, user_id = %renter, rental_id = %rental_id, "Book rented");
        Ok(RentedItem {
            book_id: reserved.id,
            title: reserved.title,
            price: reserved.price,
            rental_id,
            rented_at,
            notifications_delivered,
        })
    }

    /// Give back a reservation whose rental could not be recorded.
    ///
    /// Guarded on `renter` still holding the book, so a reservation that has
    /// since passed to someone else is left alone.
    async fn unwind(&self, book: &Book, renter: &UserId) {
        match self
            .store
            .conditional_update_book(book.id, false, Some(renter), BookPatch::unwind())
            .await
        {
            Ok(_) => warn!(book_id = %book.id, user_id = %renter, "Reservation unwound"),
            Err(StorageError::PreconditionFailed { .. }) => {
                warn!(book_id = %book.id, user_id = %renter, "Reservation no longer held, nothing to unwind")
            }
            Err(e) => error!(book_id = %book.id, user_id = %renter, error = %e, "Failed to unwind reservation"),
        }
    }
}
