//! rentshelf-demo: scripted walk through the rental lifecycle
//!
//! Wires the core to the configured catalog store and runs one scenario:
//! an owner lists three books, a competing renter claims one, a reader checks
//! out a cart holding all three, and the owner confirms a return.
//!
//! ## Configuration
//! ```yaml
//! storage:
//!   type: sqlite
//!   path: ./data/rentshelf.db
//! ```
//!
//! Or with environment variables: `RENTSHELF__STORAGE__TYPE=sqlite`.
//! Log filtering uses `RENTSHELF_LOG` (default `info`).

use chrono::{Duration, Utc};
use tracing::info;

use rentshelf::config::Config;
use rentshelf::interfaces::{FixedIdentity, UserProfile};
use rentshelf::library::{BookSort, LibraryView};
use rentshelf::model::{BookDetails, PaymentMethod, Price};
use rentshelf::storage::init_storage;
use rentshelf::utils::bootstrap::{init_tracing, parse_config_path};
use rentshelf::{
    CartManager, CheckoutOrchestrator, CheckoutRequest, Inventory, NotificationDispatcher,
    ReturnDesk, Session,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = parse_config_path();
    let config = Config::load(config_path.as_deref())?;
    let store = init_storage(&config).await?;

    let owner = Session::from_gateway(&FixedIdentity::signed_in(UserProfile::new(
        "owner-asha",
        "Asha",
        "asha@example.com",
    )))
    .await?;
    let reader = Session::from_gateway(&FixedIdentity::signed_in(UserProfile::new(
        "reader-ravi",
        "Ravi",
        "ravi@example.com",
    )))
    .await?;
    let rival = Session::new(UserProfile::new("reader-mei", "Mei", "mei@example.com"));

    let inventory = Inventory::new(store.clone());
    let orchestrator = CheckoutOrchestrator::new(store.clone(), config.checkout.clone());
    let dispatcher = NotificationDispatcher::new(store.clone());
    let returns = ReturnDesk::new(store.clone());
    let library = LibraryView::new(store.clone());

    let mut listed = Vec::new();
    for (title, author, price) in [
        ("The Left Hand of Darkness", "Ursula K. Le Guin", 1200),
        ("Piranesi", "Susanna Clarke", 950),
        ("A Fire Upon the Deep", "Vernor Vinge", 1100),
    ] {
        let details = BookDetails::new(title, author, Price::from_minor(price));
        listed.push(inventory.list_book(&owner, details).await?);
    }
    info!(books = listed.len(), "Catalog seeded");

    let mut cart = CartManager::new(reader.clone(), store.clone());
    for book in &listed {
        cart.add(book).await;
    }
    info!(items = cart.len(), total = %cart.total(), "Cart filled");

    // Someone else gets to the second book first.
    let due = Utc::now().date_naive() + Duration::days(14);
    let rival_request = CheckoutRequest::new("9 Harbour Road", PaymentMethod::Card, due);
    orchestrator
        .rent_now(&rival, listed[1].id, &rival_request)
        .await?;

    let request = CheckoutRequest::new("42 Banyan Street", PaymentMethod::Upi, due);
    let report = orchestrator
        .checkout_cart(&reader, &mut cart, &request)
        .await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(left_in_cart = cart.len(), "Checkout finished");

    let receipt = returns.confirm_return(&owner, listed[0].id).await?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);

    for notification in dispatcher.list(&reader).await? {
        println!("[{}] {}", notification.kind.as_str(), notification.message);
    }

    let renting = library.currently_rented(&reader, BookSort::Title).await?;
    let history = library.rental_history(&reader).await?;
    info!(
        renting = renting.len(),
        returned = history.len(),
        unread = dispatcher.unread_count(&reader).await?,
        "Demo complete"
    );

    Ok(())
}
