//! rentshelf - rental lifecycle core
//!
//! Availability state, cart-to-checkout pipeline, and notification fan-out for a
//! peer-to-peer book rental storefront. Storage and identity are collaborators
//! reached through the traits in [`interfaces`].

pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod inventory;
pub mod library;
pub mod model;
pub mod notifications;
pub mod returns;
pub mod session;
pub mod storage;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cart::{AddOutcome, CartManager};
pub use checkout::{CheckoutOrchestrator, CheckoutReport, CheckoutRequest};
pub use error::{CheckoutError, RentalError, ValidationError};
pub use inventory::Inventory;
pub use notifications::NotificationDispatcher;
pub use returns::ReturnDesk;
pub use session::Session;
