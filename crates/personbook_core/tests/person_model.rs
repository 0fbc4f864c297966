use personbook_core::{NewPerson, Person, PersonId, PersonValidationError};

#[test]
fn new_person_deserializes_from_document_json() {
    let payload: NewPerson = serde_json::from_str(
        r#"{ "name": "John", "age": 30, "favoriteFoods": ["sushi", "ramen"] }"#,
    )
    .unwrap();

    assert_eq!(payload.name.as_deref(), Some("John"));
    assert_eq!(payload.age, Some(30));
    assert_eq!(payload.favorite_foods, vec!["sushi", "ramen"]);
}

#[test]
fn new_person_fields_are_optional_on_the_wire() {
    let payload: NewPerson = serde_json::from_str(r#"{ "age": 3 }"#).unwrap();

    assert_eq!(payload.name, None);
    assert!(payload.favorite_foods.is_empty());
    assert_eq!(payload.validate(), Err(PersonValidationError::MissingName));
}

#[test]
fn into_person_keeps_fields_and_id() {
    let id = PersonId::generate();
    let person = NewPerson::named("Tom")
        .with_age(35)
        .with_foods(["steak"])
        .into_person(id)
        .unwrap();

    assert_eq!(person.id, id);
    assert_eq!(person.name, "Tom");
    assert_eq!(person.age, Some(35));
    assert_eq!(person.favorite_foods, vec!["steak"]);
}

#[test]
fn person_json_uses_camel_case_and_omits_missing_age() {
    let person = NewPerson::named("Mary")
        .with_foods(["burrito"])
        .into_person(PersonId::generate())
        .unwrap();

    let json = serde_json::to_value(&person).unwrap();
    assert_eq!(json["id"], person.id.to_string());
    assert_eq!(json["favoriteFoods"][0], "burrito");
    assert!(json.get("age").is_none());

    let parsed: Person = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, person);
}

#[test]
fn push_favorite_food_appends_at_end() {
    let mut person = NewPerson::named("Alice")
        .with_foods(["pizza", "pasta"])
        .into_person(PersonId::generate())
        .unwrap();

    person.push_favorite_food("hamburger");
    assert_eq!(person.favorite_foods, vec!["pizza", "pasta", "hamburger"]);
}
