use super::*;
use crate::model::UserId;
use crate::storage::InMemoryCatalogStore;
use crate::test_utils::{seed_book, session};

fn setup(user: &str) -> (Arc<InMemoryCatalogStore>, CartManager) {
    let store = Arc::new(InMemoryCatalogStore::new());
    let cart = CartManager::new(session(user), store.clone());
    (store, cart)
}

#[tokio::test]
async fn test_add_and_total() {
    let (store, mut cart) = setup("reader");
    let a = seed_book(store.as_ref(), "owner", "A", 1000).await;
    let b = seed_book(store.as_ref(), "owner", "B", 250).await;

    assert_eq!(cart.add(&a).await, AddOutcome::Added);
    assert_eq!(cart.add(&b).await, AddOutcome::Added);

    assert_eq!(cart.len(), 2);
    assert_eq!(cart.total(), Price::from_minor(1250));
    assert!(cart.contains(a.id));
}

#[tokio::test]
async fn test_empty_cart_total_is_zero() {
    let (_store, cart) = setup("reader");
    assert!(cart.is_empty());
    assert_eq!(cart.total(), Price::ZERO);
}

#[tokio::test]
async fn test_own_book_is_rejected() {
    let (store, mut cart) = setup("owner");
    let own = seed_book(store.as_ref(), "owner", "Mine", 1000).await;

    assert_eq!(cart.add(&own).await, AddOutcome::RejectedOwnBook);

    assert!(cart.is_empty());
    assert!(store
        .list_cart_items(&UserId::new("owner"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_re_adding_replaces_in_place() {
    let (store, mut cart) = setup("reader");
    let a = seed_book(store.as_ref(), "owner", "A", 1000).await;
    let b = seed_book(store.as_ref(), "owner", "B", 250).await;
    cart.add(&a).await;
    cart.add(&b).await;

    let mut repriced = a.clone();
    repriced.price = Price::from_minor(800);
    assert_eq!(cart.add(&repriced).await, AddOutcome::Replaced);

    let order: Vec<BookId> = cart.items().map(|i| i.book_id).collect();
    assert_eq!(order, vec![a.id, b.id]);
    assert_eq!(cart.total(), Price::from_minor(1050));
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let (store, mut cart) = setup("reader");
    let a = seed_book(store.as_ref(), "owner", "A", 1000).await;
    cart.add(&a).await;

    assert!(cart.remove(a.id).await);
    assert!(!cart.remove(a.id).await);
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_remove_many_keeps_order_of_rest() {
    let (store, mut cart) = setup("reader");
    let a = seed_book(store.as_ref(), "owner", "A", 100).await;
    let b = seed_book(store.as_ref(), "owner", "B", 100).await;
    let c = seed_book(store.as_ref(), "owner", "C", 100).await;
    for book in [&a, &b, &c] {
        cart.add(book).await;
    }

    assert_eq!(cart.remove_many(&[a.id, BookId::new()]).await, 1);

    let order: Vec<BookId> = cart.items().map(|i| i.book_id).collect();
    assert_eq!(order, vec![b.id, c.id]);
}

#[tokio::test]
async fn test_changes_are_mirrored() {
    let (store, mut cart) = setup("reader");
    let user = UserId::new("reader");
    let a = seed_book(store.as_ref(), "owner", "A", 100).await;
    let b = seed_book(store.as_ref(), "owner", "B", 100).await;

    cart.add(&a).await;
    cart.add(&b).await;
    assert_eq!(store.list_cart_items(&user).await.unwrap().len(), 2);

    cart.remove(a.id).await;
    let mirrored = store.list_cart_items(&user).await.unwrap();
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0].book_id, b.id);

    cart.clear().await;
    assert!(store.list_cart_items(&user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mirror_failures_do_not_affect_local_state() {
    let (store, mut cart) = setup("reader");
    let a = seed_book(store.as_ref(), "owner", "A", 100).await;
    let b = seed_book(store.as_ref(), "owner", "B", 100).await;
    store.set_fail_cart_writes(true).await;

    assert_eq!(cart.add(&a).await, AddOutcome::Added);
    assert_eq!(cart.add(&b).await, AddOutcome::Added);
    assert!(cart.remove(a.id).await);

    assert_eq!(cart.len(), 1);
    assert!(cart.contains(b.id));

    cart.clear().await;
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_restore_from_mirror() {
    let store = Arc::new(InMemoryCatalogStore::new());
    let a = seed_book(store.as_ref(), "owner", "A", 100).await;
    let b = seed_book(store.as_ref(), "owner", "B", 200).await;

    let mut first_device = CartManager::new(session("reader"), store.clone());
    first_device.add(&a).await;
    first_device.add(&b).await;

    let restored = CartManager::restore(session("reader"), store.clone()).await.unwrap();

    let order: Vec<BookId> = restored.items().map(|i| i.book_id).collect();
    assert_eq!(order, vec![a.id, b.id]);
    assert_eq!(restored.total(), Price::from_minor(300));
}

#[tokio::test]
async fn test_restore_drops_own_books() {
    let store = Arc::new(InMemoryCatalogStore::new());
    let own = seed_book(store.as_ref(), "reader", "Mine", 100).await;
    let other = seed_book(store.as_ref(), "owner", "Theirs", 100).await;
    let user = UserId::new("reader");
    store
        .put_cart_item(CartItem::for_book(user.clone(), &own, Utc::now()))
        .await
        .unwrap();
    store
        .put_cart_item(CartItem::for_book(user.clone(), &other, Utc::now()))
        .await
        .unwrap();

    let restored = CartManager::restore(session("reader"), store.clone()).await.unwrap();

    assert_eq!(restored.len(), 1);
    assert!(restored.contains(other.id));
    assert_eq!(store.list_cart_items(&user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_restore_fails_when_store_unavailable() {
    let store = Arc::new(InMemoryCatalogStore::new());
    store.set_unavailable(true).await;

    let result = CartManager::restore(session("reader"), store).await;

    assert!(matches!(result, Err(RentalError::Storage(_))));
}
