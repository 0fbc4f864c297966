//! Person document model.
//!
//! # Responsibility
//! - Define the stored `Person` document and its creation payload.
//! - Own field-level validation shared by every write path.
//!
//! # Invariants
//! - `id` is assigned once by the repository and never reused.
//! - A stored `Person` always has a non-empty `name`.
//! - `favorite_foods` keeps caller-supplied order.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque document identifier.
///
/// Rendered as hyphenated UUID text on the wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(Uuid);

impl PersonId {
    /// Generates a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses identifier text, rejecting anything that is not a UUID.
    pub fn parse(value: &str) -> Result<Self, InvalidPersonId> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| InvalidPersonId(value.to_string()))
    }
}

impl Display for PersonId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Malformed identifier text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPersonId(pub String);

impl Display for InvalidPersonId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed person id `{}`", self.0)
    }
}

impl Error for InvalidPersonId {}

/// Field validation failures for person payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonValidationError {
    /// `name` is absent or empty.
    MissingName,
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "person validation failed: `name` is required"),
        }
    }
}

impl Error for PersonValidationError {}

/// Creation payload. The repository assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl NewPerson {
    /// Builds a payload with a name and no other fields.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_foods<I, S>(mut self, foods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.favorite_foods = foods.into_iter().map(Into::into).collect();
        self
    }

    /// Checks required fields and returns the validated name.
    pub fn validate(&self) -> Result<&str, PersonValidationError> {
        validate_name(self.name.as_deref())
    }

    /// Materializes a stored document under the given id.
    ///
    /// # Errors
    /// - `MissingName` when the payload has no usable name.
    pub fn into_person(self, id: PersonId) -> Result<Person, PersonValidationError> {
        self.validate()?;
        Ok(Person {
            id,
            name: self.name.unwrap_or_default(),
            age: self.age,
            favorite_foods: self.favorite_foods,
        })
    }
}

/// Stored person document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl Person {
    /// Re-checks invariants before a whole-document write.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        validate_name(Some(self.name.as_str())).map(|_| ())
    }

    /// Appends one food, keeping existing entries in place.
    pub fn push_favorite_food(&mut self, food: impl Into<String>) {
        self.favorite_foods.push(food.into());
    }
}

/// Projected read model without the `age` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
    pub id: PersonId,
    pub name: String,
    pub favorite_foods: Vec<String>,
}

impl From<Person> for PersonSummary {
    fn from(value: Person) -> Self {
        Self {
            id: value.id,
            name: value.name,
            favorite_foods: value.favorite_foods,
        }
    }
}

fn validate_name(name: Option<&str>) -> Result<&str, PersonValidationError> {
    match name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(PersonValidationError::MissingName),
    }
}

#[cfg(test)]
mod tests {
    use super::{NewPerson, Person, PersonId, PersonSummary, PersonValidationError};

    #[test]
    fn empty_name_counts_as_missing() {
        let payload = NewPerson::named("");
        assert_eq!(payload.validate(), Err(PersonValidationError::MissingName));
    }

    #[test]
    fn person_id_rejects_non_uuid_text() {
        let err = PersonId::parse("PASTE_PERSON_ID_HERE").unwrap_err();
        assert_eq!(err.0, "PASTE_PERSON_ID_HERE");
    }

    #[test]
    fn person_id_display_parses_back() {
        let id = PersonId::generate();
        assert_eq!(PersonId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn summary_serialization_has_no_age_key() {
        let person = Person {
            id: PersonId::generate(),
            name: "Mary".to_string(),
            age: Some(28),
            favorite_foods: vec!["burrito".to_string()],
        };
        let json = serde_json::to_value(PersonSummary::from(person)).unwrap();
        assert!(json.get("age").is_none());
        assert_eq!(json["favoriteFoods"][0], "burrito");
    }
}
