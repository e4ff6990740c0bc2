//! Cucumber step definitions for interface tests.

pub mod rental_lifecycle;
