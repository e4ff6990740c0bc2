//! Rental lifecycle interface tests using Cucumber.
//!
//! These scenarios drive the core services against a real catalog store and
//! verify that every adapter honours the same contract. Select a backend via
//! environment variable:
//!
//! ```bash
//! # In-memory (default)
//! cargo test --test interfaces --features test-utils
//!
//! # SQLite
//! STORAGE_BACKEND=sqlite cargo test --test interfaces --features test-utils
//! ```

mod backend;
mod steps;

use cucumber::World;
use steps::rental_lifecycle::RentalWorld;

#[tokio::main]
async fn main() {
    println!(
        "\n=== Running Rental Lifecycle Interface Tests ({}) ===\n",
        backend::StorageBackend::from_env().name()
    );
    RentalWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/rental_lifecycle.feature")
        .await;
}
