//! Person repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Expose document-database primitives over the `people` collection.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate documents before SQL mutations.
//! - A document and its food list are always written in one transaction.
//! - Natural order is insertion order (`people.seq`).

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::person::{InvalidPersonId, NewPerson, Person, PersonId, PersonValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const REQUIRED_TABLES: &[&str] = &["people", "person_foods"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for person persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(PersonValidationError),
    Connection(DbError),
    NotFound(PersonId),
    InvalidId(String),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl RepoError {
    /// Stable machine-readable code, used in logs and CLI output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Connection(_) => "connection_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidId(_) => "invalid_id",
            Self::InvalidData(_) => "invalid_data",
            Self::UninitializedConnection { .. } | Self::MissingRequiredTable(_) => {
                "schema_not_ready"
            }
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Connection(err) => write!(f, "database request failed: {err}"),
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::InvalidId(value) => write!(f, "malformed person id `{value}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted person data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Connection(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PersonValidationError> for RepoError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<InvalidPersonId> for RepoError {
    fn from(value: InvalidPersonId) -> Self {
        Self::InvalidId(value.0)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Connection(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Connection(DbError::Sqlite(value))
    }
}

/// Conjunction of exact-match predicates. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    /// `name` equality.
    pub name: Option<String>,
    /// Membership in `favoriteFoods`.
    pub favorite_food: Option<String>,
}

impl PersonFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn by_favorite_food(food: impl Into<String>) -> Self {
        Self {
            favorite_food: Some(food.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.favorite_food.is_none()
    }

    /// Appends `AND ...` predicates for this filter to a statement whose
    /// outer table is `people`.
    fn push_sql(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        if let Some(name) = self.name.as_ref() {
            sql.push_str(" AND people.name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(food) = self.favorite_food.as_ref() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM person_foods pf
                    WHERE pf.person_id = people.id
                      AND pf.food = ?
                )",
            );
            bind_values.push(Value::Text(food.clone()));
        }
    }
}

/// Sort keys supported by `find`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Ascending by `name`, ties in natural order.
    Name,
}

/// Fields returned by a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    Full,
    /// `age` is neither read nor returned.
    ExcludeAge,
}

/// Chained query: filter, then sort, then limit, then projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonQuery {
    pub filter: PersonFilter,
    pub sort: Option<SortKey>,
    pub limit: Option<u32>,
    pub projection: Projection,
}

impl PersonQuery {
    pub fn new(filter: PersonFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort = Some(key);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn exclude_age(mut self) -> Self {
        self.projection = Projection::ExcludeAge;
        self
    }
}

/// `$set`-style field update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonUpdate {
    pub name: Option<String>,
    pub age: Option<i64>,
}

impl PersonUpdate {
    pub fn set_age(age: i64) -> Self {
        Self {
            age: Some(age),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none()
    }
}

/// Which image of the document `find_one_and_update` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnDocument {
    Before,
    After,
}

/// Outcome of a bulk delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Document-database primitives for the `people` collection.
pub trait PersonRepository {
    fn insert_one(&self, person: &NewPerson) -> RepoResult<Person>;
    /// Validates every payload first; inserts all or nothing.
    fn insert_many(&self, people: &[NewPerson]) -> RepoResult<Vec<Person>>;
    fn find(&self, query: &PersonQuery) -> RepoResult<Vec<Person>>;
    fn find_one(&self, filter: &PersonFilter) -> RepoResult<Option<Person>>;
    fn find_by_id(&self, id: PersonId) -> RepoResult<Option<Person>>;
    /// Replaces the whole stored document with `person`.
    fn save(&self, person: &Person) -> RepoResult<Person>;
    fn find_one_and_update(
        &self,
        filter: &PersonFilter,
        update: &PersonUpdate,
        return_document: ReturnDocument,
    ) -> RepoResult<Option<Person>>;
    /// Returns the document as it was before removal.
    fn find_by_id_and_remove(&self, id: PersonId) -> RepoResult<Option<Person>>;
    fn delete_many(&self, filter: &PersonFilter) -> RepoResult<DeleteResult>;
    fn count(&self, filter: &PersonFilter) -> RepoResult<u64>;
    /// Releases the underlying connection.
    fn close(self) -> RepoResult<()>
    where
        Self: Sized;
}

/// SQLite-backed person repository owning its connection.
pub struct SqlitePersonRepository {
    conn: Connection,
}

impl SqlitePersonRepository {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `user_version` is not the latest.
    /// - `MissingRequiredTable` when the schema is incomplete.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Borrows the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn select_people(&self, query: &PersonQuery, first_only: bool) -> RepoResult<Vec<Person>> {
        let columns = match query.projection {
            Projection::Full => "people.id AS id, people.name AS name, people.age AS age",
            Projection::ExcludeAge => "people.id AS id, people.name AS name",
        };
        let mut sql = format!("SELECT {columns} FROM people WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        query.filter.push_sql(&mut sql, &mut bind_values);

        match query.sort {
            Some(SortKey::Name) => sql.push_str(" ORDER BY people.name ASC, people.seq ASC"),
            None => sql.push_str(" ORDER BY people.seq ASC"),
        }

        let limit = if first_only { Some(1) } else { query.limit };
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_person_row(&self.conn, row, query.projection)?);
        }
        Ok(people)
    }

    fn load_by_id(conn: &Connection, id: PersonId) -> RepoResult<Option<Person>> {
        let mut stmt = conn.prepare(
            "SELECT people.id AS id, people.name AS name, people.age AS age
             FROM people
             WHERE people.id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_row(conn, row, Projection::Full)?));
        }
        Ok(None)
    }
}

impl PersonRepository for SqlitePersonRepository {
    fn insert_one(&self, person: &NewPerson) -> RepoResult<Person> {
        let person = person.clone().into_person(PersonId::generate())?;

        let tx = self.conn.unchecked_transaction()?;
        insert_document(&tx, &person)?;
        tx.commit()?;

        Ok(person)
    }

    fn insert_many(&self, people: &[NewPerson]) -> RepoResult<Vec<Person>> {
        let documents = people
            .iter()
            .map(|payload| payload.clone().into_person(PersonId::generate()))
            .collect::<Result<Vec<_>, _>>()?;

        let tx = self.conn.unchecked_transaction()?;
        for document in &documents {
            insert_document(&tx, document)?;
        }
        tx.commit()?;

        Ok(documents)
    }

    fn find(&self, query: &PersonQuery) -> RepoResult<Vec<Person>> {
        self.select_people(query, false)
    }

    fn find_one(&self, filter: &PersonFilter) -> RepoResult<Option<Person>> {
        let query = PersonQuery::new(filter.clone());
        Ok(self.select_people(&query, true)?.into_iter().next())
    }

    fn find_by_id(&self, id: PersonId) -> RepoResult<Option<Person>> {
        Self::load_by_id(&self.conn, id)
    }

    fn save(&self, person: &Person) -> RepoResult<Person> {
        person.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE people
             SET
                name = ?1,
                age = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?3;",
            params![person.name.as_str(), person.age, person.id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(person.id));
        }
        tx.execute(
            "DELETE FROM person_foods WHERE person_id = ?1;",
            [person.id.to_string()],
        )?;
        insert_foods(&tx, person)?;
        let saved = Self::load_by_id(&tx, person.id)?;
        tx.commit()?;

        saved.ok_or(RepoError::NotFound(person.id))
    }

    fn find_one_and_update(
        &self,
        filter: &PersonFilter,
        update: &PersonUpdate,
        return_document: ReturnDocument,
    ) -> RepoResult<Option<Person>> {
        if matches!(update.name.as_deref(), Some("")) {
            return Err(RepoError::Validation(PersonValidationError::MissingName));
        }

        let tx = self.conn.unchecked_transaction()?;

        let mut sql = String::from("SELECT people.id FROM people WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        filter.push_sql(&mut sql, &mut bind_values);
        sql.push_str(" ORDER BY people.seq ASC LIMIT 1");

        let target: Option<String> = {
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            let first = match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            };
            first
        };
        let Some(id_text) = target else {
            return Ok(None);
        };
        let id = parse_stored_id(&id_text)?;

        let before = Self::load_by_id(&tx, id)?;

        if !update.is_empty() {
            let mut assignments = Vec::new();
            let mut bind_values: Vec<Value> = Vec::new();
            if let Some(name) = update.name.as_ref() {
                assignments.push("name = ?");
                bind_values.push(Value::Text(name.clone()));
            }
            if let Some(age) = update.age {
                assignments.push("age = ?");
                bind_values.push(Value::Integer(age));
            }
            assignments.push("updated_at = (strftime('%s', 'now') * 1000)");
            bind_values.push(Value::Text(id_text));

            let sql = format!("UPDATE people SET {} WHERE id = ?;", assignments.join(", "));
            tx.execute(&sql, params_from_iter(bind_values))?;
        }

        let result = match return_document {
            ReturnDocument::Before => before,
            ReturnDocument::After => Self::load_by_id(&tx, id)?,
        };
        tx.commit()?;

        Ok(result)
    }

    fn find_by_id_and_remove(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(snapshot) = Self::load_by_id(&tx, id)? else {
            return Ok(None);
        };
        tx.execute(
            "DELETE FROM person_foods WHERE person_id = ?1;",
            [id.to_string()],
        )?;
        tx.execute("DELETE FROM people WHERE id = ?1;", [id.to_string()])?;
        tx.commit()?;

        Ok(Some(snapshot))
    }

    fn delete_many(&self, filter: &PersonFilter) -> RepoResult<DeleteResult> {
        let mut predicate = String::from("WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        filter.push_sql(&mut predicate, &mut bind_values);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!(
                "DELETE FROM person_foods
                 WHERE person_id IN (SELECT people.id FROM people {predicate});"
            ),
            params_from_iter(bind_values.iter()),
        )?;
        let deleted = tx.execute(
            &format!("DELETE FROM people {predicate};"),
            params_from_iter(bind_values.iter()),
        )?;
        tx.commit()?;

        Ok(DeleteResult {
            deleted_count: deleted as u64,
        })
    }

    fn count(&self, filter: &PersonFilter) -> RepoResult<u64> {
        let mut sql = String::from("SELECT COUNT(*) FROM people WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        filter.push_sql(&mut sql, &mut bind_values);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative document count `{count}`")))
    }

    fn close(self) -> RepoResult<()> {
        self.conn.close().map_err(|(_, err)| RepoError::from(err))
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::MissingRequiredTable(*table));
        }
    }

    Ok(())
}

fn insert_document(conn: &Connection, person: &Person) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO people (id, name, age) VALUES (?1, ?2, ?3);",
        params![person.id.to_string(), person.name.as_str(), person.age],
    )?;
    insert_foods(conn, person)
}

fn insert_foods(conn: &Connection, person: &Person) -> RepoResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO person_foods (person_id, position, food) VALUES (?1, ?2, ?3);",
    )?;
    let id = person.id.to_string();
    for (position, food) in person.favorite_foods.iter().enumerate() {
        stmt.execute(params![id.as_str(), position as i64, food.as_str()])?;
    }
    Ok(())
}

fn load_foods(conn: &Connection, id_text: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT food
         FROM person_foods
         WHERE person_id = ?1
         ORDER BY position ASC;",
    )?;
    let foods = stmt
        .query_map([id_text], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(foods)
}

fn parse_person_row(conn: &Connection, row: &Row<'_>, projection: Projection) -> RepoResult<Person> {
    let id_text: String = row.get("id")?;
    let id = parse_stored_id(&id_text)?;
    let age = match projection {
        Projection::Full => row.get("age")?,
        Projection::ExcludeAge => None,
    };

    let person = Person {
        id,
        name: row.get("name")?,
        age,
        favorite_foods: load_foods(conn, &id_text)?,
    };
    person.validate().map_err(|_| {
        RepoError::InvalidData(format!("empty name stored for person `{id_text}`"))
    })?;
    Ok(person)
}

fn parse_stored_id(value: &str) -> RepoResult<PersonId> {
    PersonId::parse(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid id value `{value}` in people.id")))
}
