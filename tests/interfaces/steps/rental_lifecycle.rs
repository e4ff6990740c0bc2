//! Rental lifecycle step definitions.

use std::collections::HashMap;
use std::sync::Arc;

use cucumber::{given, then, when, World};
use rentshelf::checkout::{CheckoutReport, SkipReason};
use rentshelf::config::CheckoutConfig;
use rentshelf::interfaces::CatalogStore;
use rentshelf::library::LibraryView;
use rentshelf::model::{Book, Price, UserId};
use rentshelf::test_utils::{details, request, session};
use rentshelf::{
    CartManager, CheckoutError, CheckoutOrchestrator, Inventory, NotificationDispatcher,
    RentalError, ReturnDesk,
};

use crate::backend::{StorageBackend, StorageContext};

/// Core services wired to one store.
struct Services {
    inventory: Inventory,
    orchestrator: CheckoutOrchestrator,
    dispatcher: NotificationDispatcher,
    returns: ReturnDesk,
    library: LibraryView,
}

impl Services {
    fn over(store: &Arc<dyn CatalogStore>) -> Self {
        Self {
            inventory: Inventory::new(store.clone()),
            orchestrator: CheckoutOrchestrator::new(store.clone(), CheckoutConfig::default()),
            dispatcher: NotificationDispatcher::new(store.clone()),
            returns: ReturnDesk::new(store.clone()),
            library: LibraryView::new(store.clone()),
        }
    }
}

/// Test context for rental lifecycle scenarios.
#[derive(World)]
#[world(init = Self::new)]
pub struct RentalWorld {
    storage: StorageContext,
    services: Services,
    books: HashMap<String, Book>,
    carts: HashMap<String, CartManager>,
    last_error: Option<RentalError>,
    last_report: Option<CheckoutReport>,
    checkout_error: Option<CheckoutError>,
}

impl std::fmt::Debug for RentalWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RentalWorld")
            .field("storage", &self.storage)
            .field("books", &self.books.keys().collect::<Vec<_>>())
            .field("last_error", &self.last_error)
            .field("last_report", &self.last_report)
            .field("checkout_error", &self.checkout_error)
            .finish()
    }
}

impl RentalWorld {
    fn new() -> Self {
        let storage = StorageContext::memory();
        let services = Services::over(&storage.store);
        Self {
            storage,
            services,
            books: HashMap::new(),
            carts: HashMap::new(),
            last_error: None,
            last_report: None,
            checkout_error: None,
        }
    }

    fn book(&self, title: &str) -> &Book {
        self.books
            .get(title)
            .unwrap_or_else(|| panic!("No book titled {title:?} was listed"))
    }

    async fn current(&self, title: &str) -> Book {
        self.services
            .inventory
            .get_book(self.book(title).id)
            .await
            .expect("Failed to fetch book")
    }

    async fn rent_now(&mut self, user: &str, title: &str) {
        let book_id = self.book(title).id;
        let report = self
            .services
            .orchestrator
            .rent_now(&session(user), book_id, &request())
            .await
            .expect("Rent now should succeed");
        assert_eq!(report.rented.len(), 1);
    }

    async fn add_to_cart(&mut self, user: &str, title: &str) {
        let book = self.current(title).await;
        let store = self.storage.store.clone();
        let cart = self
            .carts
            .entry(user.to_string())
            .or_insert_with(|| CartManager::new(session(user), store));
        cart.add(&book).await;
    }

    fn cart_titles(&self, user: &str) -> Vec<String> {
        self.carts
            .get(user)
            .map(|cart| cart.items().map(|item| item.title.clone()).collect())
            .unwrap_or_default()
    }
}

fn error_kind(err: &RentalError) -> &'static str {
    match err {
        RentalError::NotFound { .. } => "not found",
        RentalError::Conflict { .. } => "conflict",
        RentalError::OwnershipViolation { .. } => "ownership violation",
        RentalError::PermissionDenied { .. } => "permission denied",
        RentalError::ResourceBusy { .. } => "resource busy",
        RentalError::AlreadyAvailable { .. } => "already available",
        RentalError::Unauthenticated => "unauthenticated",
        RentalError::Validation(_) => "validation",
        RentalError::Storage(_) => "storage",
        RentalError::NotificationPermissionDenied { .. } | RentalError::NotificationNotFound { .. } => {
            "notification"
        }
    }
}

// ==========================================================================
// Background
// ==========================================================================

#[given("a rental shelf on the configured backend")]
async fn given_rental_shelf(world: &mut RentalWorld) {
    world.storage = StorageContext::new(StorageBackend::from_env()).await;
    world.services = Services::over(&world.storage.store);
}

// ==========================================================================
// Catalog and cart setup
// ==========================================================================

#[given(expr = "{string} lists {string} priced {int}")]
async fn given_listed_book(world: &mut RentalWorld, owner: String, title: String, price: u64) {
    let book = world
        .services
        .inventory
        .list_book(&session(&owner), details(&title, price))
        .await
        .expect("Failed to list book");
    world.books.insert(title, book);
}

#[given(expr = "{string} rents {string} now")]
async fn given_rented(world: &mut RentalWorld, user: String, title: String) {
    world.rent_now(&user, &title).await;
}

#[when(expr = "{string} rents {string} now")]
async fn when_rents_now(world: &mut RentalWorld, user: String, title: String) {
    world.rent_now(&user, &title).await;
}

#[given(expr = "{string} adds {string} to the cart")]
async fn given_added_to_cart(world: &mut RentalWorld, user: String, title: String) {
    world.add_to_cart(&user, &title).await;
}

#[when(expr = "{string} adds {string} to the cart")]
async fn when_adds_to_cart(world: &mut RentalWorld, user: String, title: String) {
    world.add_to_cart(&user, &title).await;
}

// ==========================================================================
// Actions
// ==========================================================================

#[when(expr = "{string} tries to reserve {string}")]
async fn when_tries_to_reserve(world: &mut RentalWorld, user: String, title: String) {
    let book_id = world.book(&title).id;
    world.last_error = world
        .services
        .inventory
        .try_reserve(book_id, &UserId::new(user))
        .await
        .err();
}

#[when(expr = "{string} checks out the cart")]
async fn when_checks_out(world: &mut RentalWorld, user: String) {
    let cart = world
        .carts
        .get_mut(&user)
        .unwrap_or_else(|| panic!("{user} has no cart"));
    match world
        .services
        .orchestrator
        .checkout_cart(&session(&user), cart, &request())
        .await
    {
        Ok(report) => world.last_report = Some(report),
        Err(e) => world.checkout_error = Some(e),
    }
}

#[when(expr = "{string} confirms the return of {string}")]
async fn when_confirms_return(world: &mut RentalWorld, owner: String, title: String) {
    let book_id = world.book(&title).id;
    let receipt = world
        .services
        .returns
        .confirm_return(&session(&owner), book_id)
        .await
        .expect("Return should be confirmed");
    assert!(receipt.audit_recorded);
}

#[when(expr = "{string} deletes {string}")]
async fn when_deletes(world: &mut RentalWorld, owner: String, title: String) {
    let book_id = world.book(&title).id;
    world.last_error = world
        .services
        .inventory
        .delete(book_id, &UserId::new(owner))
        .await
        .err();
}

// ==========================================================================
// Book state
// ==========================================================================

#[then(expr = "{string} is rented by {string}")]
async fn then_rented_by(world: &mut RentalWorld, title: String, user: String) {
    let book = world.current(&title).await;
    assert!(!book.is_available, "{title} should be rented");
    assert_eq!(book.rented_by, Some(UserId::new(user)));
}

#[then(expr = "{string} is available")]
async fn then_available(world: &mut RentalWorld, title: String) {
    let book = world.current(&title).await;
    assert!(book.is_available, "{title} should be available");
    assert_eq!(book.rented_by, None);
    assert_eq!(book.rented_at, None);
}

#[then(expr = "{string} no longer exists")]
async fn then_deleted(world: &mut RentalWorld, title: String) {
    let book_id = world.book(&title).id;
    let result = world.services.inventory.get_book(book_id).await;
    assert!(matches!(result, Err(RentalError::NotFound { .. })));
}

#[then(expr = "the operation fails with {string}")]
async fn then_operation_fails(world: &mut RentalWorld, kind: String) {
    let err = world
        .last_error
        .as_ref()
        .expect("Expected the operation to fail");
    assert_eq!(error_kind(err), kind, "unexpected error: {err}");
}

// ==========================================================================
// Cart and checkout
// ==========================================================================

#[then(expr = "the cart of {string} is empty")]
async fn then_cart_empty(world: &mut RentalWorld, user: String) {
    assert!(world.cart_titles(&user).is_empty());
}

#[then(expr = "the cart of {string} holds only {string}")]
async fn then_cart_holds_only(world: &mut RentalWorld, user: String, title: String) {
    assert_eq!(world.cart_titles(&user), vec![title]);
}

#[then(expr = "{int} books are rented totalling {int}")]
async fn then_books_rented(world: &mut RentalWorld, count: usize, total: u64) {
    let report = world.last_report.as_ref().expect("Expected a checkout report");
    assert_eq!(report.rented.len(), count);
    assert_eq!(report.total(), Price::from_minor(total));
}

#[then(expr = "{string} is skipped as unavailable")]
async fn then_skipped(world: &mut RentalWorld, title: String) {
    let report = world.last_report.as_ref().expect("Expected a checkout report");
    let skipped = report
        .skipped
        .iter()
        .find(|item| item.title == title)
        .unwrap_or_else(|| panic!("{title} was not skipped"));
    assert_eq!(skipped.reason, SkipReason::ItemUnavailable);
}

#[then("the checkout fails with nothing rentable")]
async fn then_nothing_rentable(world: &mut RentalWorld) {
    assert!(matches!(
        world.checkout_error,
        Some(CheckoutError::NothingRentable { .. })
    ));
    assert!(world.last_report.is_none());
}

// ==========================================================================
// Notifications and history
// ==========================================================================

#[then(regex = r#"^"([^"]+)" has (\d+) unread notifications?$"#)]
async fn then_unread(world: &mut RentalWorld, user: String, count: usize) {
    let unread = world
        .services
        .dispatcher
        .unread_count(&session(&user))
        .await
        .expect("Failed to count notifications");
    assert_eq!(unread, count);
}

#[then(regex = r#"^the rental history of "([^"]+)" has (\d+) entr(?:y|ies)$"#)]
async fn then_history(world: &mut RentalWorld, user: String, count: usize) {
    let history = world
        .services
        .library
        .rental_history(&session(&user))
        .await
        .expect("Failed to read history");
    assert_eq!(history.len(), count);
}
