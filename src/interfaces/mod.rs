//! Abstract interfaces for the external collaborators.
//!
//! These traits define the contracts for:
//! - Catalog storage (books, cart mirror, rental records, notifications)
//! - Identity (the signed-in user)
//! - Live notification subscriptions

pub mod catalog_store;
pub mod identity;
pub mod subscription;

pub use catalog_store::{CatalogStore, StorageError};
pub use identity::{FixedIdentity, IdentityGateway, UserProfile};
pub use subscription::{NotificationListener, Subscription};
