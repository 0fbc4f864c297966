//! Core domain logic for Personbook.
//! This crate owns the `people` document collection and its CRUD contract.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::person::{
    InvalidPersonId, NewPerson, Person, PersonId, PersonSummary, PersonValidationError,
};
pub use repo::person_repo::{
    DeleteResult, PersonFilter, PersonQuery, PersonRepository, PersonUpdate, Projection,
    RepoError, RepoResult, ReturnDocument, SortKey, SqlitePersonRepository,
};
pub use service::person_store::{PersonStore, FOOD_QUERY_LIMIT};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
