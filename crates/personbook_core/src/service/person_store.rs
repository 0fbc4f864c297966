//! Person store use-case service.
//!
//! # Responsibility
//! - Expose one entry point per CRUD pattern over the `people` collection.
//! - Map each entry point onto exactly one repository primitive, except
//!   the edit-then-save flow which is load, mutate, store.
//! - Emit one metadata-only `event=<op>` log line per call.
//!
//! # Invariants
//! - Store APIs never bypass repository validation.
//! - By-id entry points reject malformed ids before touching storage.
//! - `append_favorite_food_and_save` is not atomic; concurrent savers of
//!   the same document overwrite each other.

use crate::config::StoreConfig;
use crate::db::open_db_from_uri;
use crate::model::person::{NewPerson, Person, PersonId, PersonSummary};
use crate::repo::person_repo::{
    DeleteResult, PersonFilter, PersonQuery, PersonRepository, PersonUpdate, RepoError,
    RepoResult, ReturnDocument, SortKey, SqlitePersonRepository,
};
use log::{info, warn};
use std::time::Instant;

/// Result cap for `query_by_food_sorted_limited`.
pub const FOOD_QUERY_LIMIT: u32 = 2;

/// CRUD facade over an injected person repository.
pub struct PersonStore<R: PersonRepository> {
    repo: R,
}

impl PersonStore<SqlitePersonRepository> {
    /// Opens the configured database and wraps it in a ready store.
    ///
    /// # Errors
    /// - `Connection` when the database cannot be opened or migrated.
    /// - `UninitializedConnection`/`MissingRequiredTable` when the schema
    ///   is not usable.
    pub fn open(config: &StoreConfig) -> RepoResult<Self> {
        let started_at = Instant::now();
        let result = open_db_from_uri(&config.db_uri)
            .map_err(RepoError::from)
            .and_then(SqlitePersonRepository::try_new)
            .map(Self::new);
        log_outcome("store_open", started_at, &result);
        result
    }
}

impl<R: PersonRepository> PersonStore<R> {
    /// Creates a store using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Borrows the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Releases the repository and its connection.
    pub fn close(self) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.close();
        log_outcome("store_close", started_at, &result);
        result
    }

    /// Validates and stores one person.
    pub fn create_one(&self, person: &NewPerson) -> RepoResult<Person> {
        self.run("person_create_one", || self.repo.insert_one(person))
    }

    /// Stores several people in input order.
    ///
    /// The first invalid payload aborts the call and nothing is stored.
    pub fn create_many(&self, people: &[NewPerson]) -> RepoResult<Vec<Person>> {
        self.run("person_create_many", || self.repo.insert_many(people))
    }

    /// Returns every person with exactly this name, in natural order.
    pub fn find_by_name(&self, name: &str) -> RepoResult<Vec<Person>> {
        self.run("person_find_by_name", || {
            self.repo
                .find(&PersonQuery::new(PersonFilter::by_name(name)))
        })
    }

    /// Returns the first person, in natural order, listing `food`.
    pub fn find_one_by_favorite_food(&self, food: &str) -> RepoResult<Option<Person>> {
        self.run("person_find_one_by_food", || {
            self.repo.find_one(&PersonFilter::by_favorite_food(food))
        })
    }

    /// Loads one person by id.
    ///
    /// # Errors
    /// - `InvalidId` when `id` is not a well-formed id.
    /// - `NotFound` when no document has this id.
    pub fn find_by_id(&self, id: &str) -> RepoResult<Person> {
        self.run("person_find_by_id", || {
            let id = PersonId::parse(id)?;
            self.repo.find_by_id(id)?.ok_or(RepoError::NotFound(id))
        })
    }

    /// Loads a person, appends `food` in memory, then writes the whole
    /// document back.
    pub fn append_favorite_food_and_save(&self, id: &str, food: &str) -> RepoResult<Person> {
        self.run("person_append_food_and_save", || {
            let id = PersonId::parse(id)?;
            let mut person = self.repo.find_by_id(id)?.ok_or(RepoError::NotFound(id))?;
            person.push_favorite_food(food);
            self.repo.save(&person)
        })
    }

    /// Sets `age` on the first person named `name` and returns the updated
    /// document. No match yields `Ok(None)`.
    pub fn update_age_by_name(&self, name: &str, age: i64) -> RepoResult<Option<Person>> {
        self.run("person_update_age_by_name", || {
            self.repo.find_one_and_update(
                &PersonFilter::by_name(name),
                &PersonUpdate::set_age(age),
                ReturnDocument::After,
            )
        })
    }

    /// Removes one person and returns the document as it was stored.
    pub fn delete_by_id(&self, id: &str) -> RepoResult<Person> {
        self.run("person_delete_by_id", || {
            let id = PersonId::parse(id)?;
            self.repo
                .find_by_id_and_remove(id)?
                .ok_or(RepoError::NotFound(id))
        })
    }

    /// Removes every person with exactly this name.
    pub fn delete_all_by_name(&self, name: &str) -> RepoResult<DeleteResult> {
        self.run("person_delete_all_by_name", || {
            self.repo.delete_many(&PersonFilter::by_name(name))
        })
    }

    /// Returns up to two people listing `food`, sorted by name, without age.
    pub fn query_by_food_sorted_limited(&self, food: &str) -> RepoResult<Vec<PersonSummary>> {
        self.run("person_query_by_food", || {
            let query = PersonQuery::new(PersonFilter::by_favorite_food(food))
                .sort_by(SortKey::Name)
                .limit(FOOD_QUERY_LIMIT)
                .exclude_age();
            let people = self.repo.find(&query)?;
            Ok(people.into_iter().map(PersonSummary::from).collect())
        })
    }

    fn run<T, F>(&self, event: &'static str, op: F) -> RepoResult<T>
    where
        F: FnOnce() -> RepoResult<T>,
    {
        let started_at = Instant::now();
        let result = op();
        log_outcome(event, started_at, &result);
        result
    }
}

fn log_outcome<T>(event: &str, started_at: Instant, result: &RepoResult<T>) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!("event={event} module=store status=ok duration_ms={duration_ms}"),
        Err(err) => warn!(
            "event={event} module=store status=error duration_ms={duration_ms} error_code={}",
            err.error_code()
        ),
    }
}
