use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use super::*;
use crate::model::{NotificationKind, PaymentMethod, Price, RentalStatus};

async fn open_store() -> (SqliteCatalogStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.db");
    let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();
    let store = SqliteCatalogStore::new(pool, NotificationFeed::default());
    store.init().await.unwrap();
    (store, dir)
}

fn details(title: &str) -> BookDetails {
    BookDetails::new(title, "Author", Price::from_minor(2500)).with_description("worn spine")
}

#[tokio::test]
async fn test_insert_and_get_round_trips_all_fields() {
    let (store, _dir) = open_store().await;
    let owner = UserId::new("owner");

    let book = store
        .insert_book(&owner, details("Dune").with_image("dune.png"))
        .await
        .unwrap();
    let fetched = store.get_book(book.id).await.unwrap();

    assert_eq!(fetched, book);
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let (store, _dir) = open_store().await;
    store.init().await.unwrap();
}

#[tokio::test]
async fn test_conditional_update_guard() {
    let (store, _dir) = open_store().await;
    let book = store.insert_book(&UserId::new("owner"), details("Dune")).await.unwrap();
    let now = Utc::now();

    let reserved = store
        .conditional_update_book(book.id, true, None, BookPatch::reserve(UserId::new("a"), now))
        .await
        .unwrap();
    assert!(!reserved.is_available);
    assert_eq!(reserved.rented_by, Some(UserId::new("a")));
    assert_eq!(reserved.rented_at, Some(now));

    let stale = store
        .conditional_update_book(book.id, true, None, BookPatch::reserve(UserId::new("b"), now))
        .await;
    assert!(matches!(
        stale,
        Err(StorageError::PreconditionFailed { expected: true, .. })
    ));

    let missing = store
        .conditional_update_book(BookId::new(), true, None, BookPatch::unwind())
        .await;
    assert!(matches!(missing, Err(StorageError::NotFound { .. })));
}

#[tokio::test]
async fn test_release_clears_renter_and_stamps_return() {
    let (store, _dir) = open_store().await;
    let book = store.insert_book(&UserId::new("owner"), details("Dune")).await.unwrap();
    store
        .conditional_update_book(book.id, true, None, BookPatch::reserve(UserId::new("a"), Utc::now()))
        .await
        .unwrap();

    let returned_at = Utc::now();
    let released = store
        .conditional_update_book(book.id, false, None, BookPatch::release(returned_at))
        .await
        .unwrap();

    assert!(released.is_available);
    assert_eq!(released.rented_by, None);
    assert_eq!(released.rented_at, None);
    assert_eq!(released.last_returned_at, Some(returned_at));
}

#[tokio::test]
async fn test_details_patch_keeps_rental_fields() {
    let (store, _dir) = open_store().await;
    let book = store.insert_book(&UserId::new("owner"), details("Dune")).await.unwrap();

    let edited = store
        .conditional_update_book(
            book.id,
            true,
            None,
            BookPatch::details(BookDetails::new("Dune Messiah", "Herbert", Price::from_minor(900))),
        )
        .await
        .unwrap();

    assert_eq!(edited.title, "Dune Messiah");
    assert_eq!(edited.price, Price::from_minor(900));
    assert_eq!(edited.image, None);
    assert!(edited.is_available);
}

#[tokio::test]
async fn test_conditional_delete() {
    let (store, _dir) = open_store().await;
    let book = store.insert_book(&UserId::new("owner"), details("Dune")).await.unwrap();

    let wrong = store.conditional_delete_book(book.id, false).await;
    assert!(matches!(wrong, Err(StorageError::PreconditionFailed { .. })));

    store.conditional_delete_book(book.id, true).await.unwrap();
    assert!(matches!(
        store.get_book(book.id).await,
        Err(StorageError::NotFound { .. })
    ));
    assert!(matches!(
        store.conditional_delete_book(book.id, true).await,
        Err(StorageError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_book_queries() {
    let (store, _dir) = open_store().await;
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");

    let a1 = store.insert_book(&alice, details("A1")).await.unwrap();
    let a2 = store.insert_book(&alice, details("A2")).await.unwrap();
    store.insert_book(&bob, details("B1")).await.unwrap();
    store
        .conditional_update_book(a1.id, true, None, BookPatch::reserve(bob.clone(), Utc::now()))
        .await
        .unwrap();

    let owned: Vec<BookId> = store
        .query_books_by_owner(&alice)
        .await
        .unwrap()
        .iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(owned, vec![a1.id, a2.id]);

    let rented = store.query_books_by_renter(&bob).await.unwrap();
    assert_eq!(rented.len(), 1);
    assert_eq!(rented[0].id, a1.id);

    assert_eq!(store.list_available_books().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rental_records_round_trip_in_append_order() {
    let (store, _dir) = open_store().await;
    let book = store.insert_book(&UserId::new("owner"), details("Dune")).await.unwrap();
    let renter = UserId::new("renter");
    let rental = RentalRecord::rented(
        &book,
        renter.clone(),
        Utc::now(),
        Utc::now().date_naive(),
        "221B Baker Street",
        PaymentMethod::Upi,
    );

    store.append_rental_record(rental.clone()).await.unwrap();
    store
        .append_rental_record(rental.returned(Utc::now()))
        .await
        .unwrap();

    let history = store.query_rentals_by_renter(&renter).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], rental);
    assert_eq!(history[1].status, RentalStatus::Returned);
    assert_eq!(store.query_rentals_by_book(book.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_notifications_read_flag_and_feed() {
    let (store, _dir) = open_store().await;
    let user = UserId::new("reader");
    let received: Arc<Mutex<Vec<NotificationChange>>> = Arc::default();
    let sink = received.clone();
    let _subscription = store
        .subscribe_to_notifications(
            &user,
            Arc::new(move |change: NotificationChange| sink.lock().unwrap().push(change)),
        )
        .await
        .unwrap();

    let notification = Notification::new(
        user.clone(),
        NotificationKind::RentalToRenter,
        BookId::new(),
        Utc::now(),
        "You rented Dune".to_string(),
    );
    let id = store.append_notification(notification.clone()).await.unwrap();
    assert_eq!(store.get_notification(id).await.unwrap(), notification);

    store.mark_notification_read(id).await.unwrap();
    store.mark_notification_read(id).await.unwrap();
    assert!(store.get_notification(id).await.unwrap().read);
    assert_eq!(store.list_notifications(&user).await.unwrap().len(), 1);
    assert!(matches!(
        store.mark_notification_read(NotificationId::new()).await,
        Err(StorageError::NotFound { .. })
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    // The second mark is a no-op and publishes nothing.
    assert_eq!(received.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cart_upsert_keeps_order() {
    let (store, _dir) = open_store().await;
    let user = UserId::new("reader");
    let owner = UserId::new("owner");
    let b1 = store.insert_book(&owner, details("One")).await.unwrap();
    let b2 = store.insert_book(&owner, details("Two")).await.unwrap();

    store.put_cart_item(CartItem::for_book(user.clone(), &b1, Utc::now())).await.unwrap();
    store.put_cart_item(CartItem::for_book(user.clone(), &b2, Utc::now())).await.unwrap();
    store.put_cart_item(CartItem::for_book(user.clone(), &b1, Utc::now())).await.unwrap();

    let order: Vec<BookId> = store
        .list_cart_items(&user)
        .await
        .unwrap()
        .iter()
        .map(|i| i.book_id)
        .collect();
    assert_eq!(order, vec![b1.id, b2.id]);

    store.remove_cart_item(&user, b1.id).await.unwrap();
    assert_eq!(store.list_cart_items(&user).await.unwrap().len(), 1);
    store.clear_cart(&user).await.unwrap();
    assert!(store.list_cart_items(&user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unstorable_price_is_rejected_before_write() {
    let (store, _dir) = open_store().await;
    let owner = UserId::new("owner");
    let ok = store.insert_book(&owner, details("Dune")).await.unwrap();

    let huge = BookDetails::new("Gold", "Author", Price::from_minor(u64::MAX));
    let result = store.insert_book(&owner, huge.clone()).await;
    assert!(matches!(
        result,
        Err(StorageError::OutOfRange { field: "price", value: u64::MAX })
    ));

    let edit = store
        .conditional_update_book(ok.id, true, None, BookPatch::details(huge))
        .await;
    assert!(matches!(edit, Err(StorageError::OutOfRange { .. })));

    assert_eq!(store.list_available_books().await.unwrap(), vec![ok.clone()]);
    assert_eq!(store.get_book(ok.id).await.unwrap(), ok);
}

#[tokio::test]
async fn test_conditional_update_renter_guard() {
    let (store, _dir) = open_store().await;
    let book = store.insert_book(&UserId::new("owner"), details("Dune")).await.unwrap();
    let rival = UserId::new("rival");
    store
        .conditional_update_book(book.id, true, None, BookPatch::reserve(rival.clone(), Utc::now()))
        .await
        .unwrap();

    let wrong = store
        .conditional_update_book(book.id, false, Some(&UserId::new("reader")), BookPatch::unwind())
        .await;
    assert!(matches!(wrong, Err(StorageError::PreconditionFailed { .. })));
    assert_eq!(store.get_book(book.id).await.unwrap().rented_by, Some(rival.clone()));

    let released = store
        .conditional_update_book(book.id, false, Some(&rival), BookPatch::unwind())
        .await
        .unwrap();
    assert!(released.is_available);
}
