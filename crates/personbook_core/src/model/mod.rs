//! Document model for the `people` collection.
//!
//! # Responsibility
//! - Define the canonical data structures used by repository and store.
//!
//! # Invariants
//! - Every stored document is identified by a stable `PersonId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod person;
