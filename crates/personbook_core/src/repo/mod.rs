//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define document-database primitives for the `people` collection.
//! - Isolate SQLite query details from the store.
//!
//! # Invariants
//! - Repository writes enforce person validation before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `InvalidId`) in
//!   addition to transport errors.

pub mod person_repo;
