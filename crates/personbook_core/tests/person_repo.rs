use personbook_core::db::migrations::latest_version;
use personbook_core::db::open_db_in_memory;
use personbook_core::{
    NewPerson, Person, PersonFilter, PersonId, PersonQuery, PersonRepository, PersonUpdate,
    RepoError, ReturnDocument, SortKey, SqlitePersonRepository,
};
use rusqlite::Connection;

fn open_repo() -> SqlitePersonRepository {
    SqlitePersonRepository::try_new(open_db_in_memory().unwrap()).unwrap()
}

fn seed(repo: &SqlitePersonRepository) -> Vec<Person> {
    repo.insert_many(&[
        NewPerson::named("Tom").with_age(35).with_foods(["steak", "burrito"]),
        NewPerson::named("Mary").with_age(28).with_foods(["burrito"]),
        NewPerson::named("John").with_age(30).with_foods(["sushi"]),
        NewPerson::named("Mary").with_foods(["tea", "burrito"]),
    ])
    .unwrap()
}

#[test]
fn empty_filter_matches_all_in_natural_order() {
    let repo = open_repo();
    let seeded = seed(&repo);

    let all = repo.find(&PersonQuery::default()).unwrap();
    assert_eq!(all, seeded);
    assert_eq!(repo.count(&PersonFilter::default()).unwrap(), 4);
}

#[test]
fn combined_filter_requires_every_predicate() {
    let repo = open_repo();
    seed(&repo);

    let filter = PersonFilter {
        name: Some("Mary".to_string()),
        favorite_food: Some("tea".to_string()),
    };
    let matches = repo.find(&PersonQuery::new(filter.clone())).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].age, None);
    assert_eq!(repo.count(&filter).unwrap(), 1);
}

#[test]
fn sort_by_name_breaks_ties_in_natural_order() {
    let repo = open_repo();
    let seeded = seed(&repo);

    let sorted = repo
        .find(&PersonQuery::new(PersonFilter::default()).sort_by(SortKey::Name))
        .unwrap();
    let ids: Vec<PersonId> = sorted.iter().map(|person| person.id).collect();
    assert_eq!(
        ids,
        vec![seeded[2].id, seeded[1].id, seeded[3].id, seeded[0].id]
    );
}

#[test]
fn exclude_age_projection_drops_age_only() {
    let repo = open_repo();
    seed(&repo);

    let projected = repo
        .find(
            &PersonQuery::new(PersonFilter::by_name("Tom"))
                .exclude_age()
                .limit(5),
        )
        .unwrap();
    assert_eq!(projected.len(), 1);
    assert_eq!(projected[0].age, None);
    assert_eq!(projected[0].favorite_foods, vec!["steak", "burrito"]);
}

#[test]
fn find_one_and_update_can_return_either_image() {
    let repo = open_repo();
    seed(&repo);

    let before = repo
        .find_one_and_update(
            &PersonFilter::by_name("John"),
            &PersonUpdate::set_age(31),
            ReturnDocument::Before,
        )
        .unwrap()
        .unwrap();
    assert_eq!(before.age, Some(30));

    let after = repo
        .find_one_and_update(
            &PersonFilter::by_name("John"),
            &PersonUpdate::set_age(32),
            ReturnDocument::After,
        )
        .unwrap()
        .unwrap();
    assert_eq!(after.age, Some(32));
    assert_eq!(after.id, before.id);
}

#[test]
fn find_one_and_update_rejects_empty_name() {
    let repo = open_repo();
    seed(&repo);

    let update = PersonUpdate {
        name: Some(String::new()),
        age: None,
    };
    let err = repo
        .find_one_and_update(&PersonFilter::by_name("Tom"), &update, ReturnDocument::After)
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(repo.find(&PersonQuery::new(PersonFilter::by_name("Tom"))).unwrap().len(), 1);
}

#[test]
fn save_replaces_whole_document() {
    let repo = open_repo();
    let mut person = repo
        .insert_one(&NewPerson::named("Tom").with_age(35).with_foods(["steak"]))
        .unwrap();

    person.name = "Thomas".to_string();
    person.age = None;
    person.favorite_foods = vec!["salad".to_string(), "soup".to_string()];
    let saved = repo.save(&person).unwrap();
    assert_eq!(saved, person);

    let loaded = repo.find_by_id(person.id).unwrap().unwrap();
    assert_eq!(loaded, person);
}

#[test]
fn save_unknown_document_is_not_found() {
    let repo = open_repo();
    let ghost = NewPerson::named("Ghost")
        .into_person(PersonId::generate())
        .unwrap();

    let err = repo.save(&ghost).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == ghost.id));
}

#[test]
fn remove_deletes_food_rows_too() {
    let repo = open_repo();
    let seeded = seed(&repo);

    let removed = repo.find_by_id_and_remove(seeded[0].id).unwrap().unwrap();
    assert_eq!(removed, seeded[0]);
    assert!(repo.find_by_id_and_remove(seeded[0].id).unwrap().is_none());

    let orphaned: i64 = repo
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM person_foods WHERE person_id = ?1;",
            [seeded[0].id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphaned, 0);
}

#[test]
fn delete_many_with_food_filter_leaves_other_documents() {
    let repo = open_repo();
    seed(&repo);

    let result = repo
        .delete_many(&PersonFilter::by_favorite_food("burrito"))
        .unwrap();
    assert_eq!(result.deleted_count, 3);

    let rest = repo.find(&PersonQuery::default()).unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].name, "John");

    let food_rows: i64 = repo
        .connection()
        .query_row("SELECT COUNT(*) FROM person_foods;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(food_rows, 1);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqlitePersonRepository::try_new(conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_tables() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqlitePersonRepository::try_new(conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("people"))
    ));
}

#[test]
fn close_releases_connection() {
    let repo = open_repo();
    seed(&repo);
    repo.close().unwrap();
}
