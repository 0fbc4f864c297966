//! Sample documents used when a sub-command is run without input.

use personbook_core::NewPerson;

pub const DEFAULT_APPENDED_FOOD: &str = "hamburger";
pub const DEFAULT_UPDATED_AGE: i64 = 20;
pub const DEFAULT_DELETE_NAME: &str = "Mary";
pub const DEFAULT_QUERY_FOOD: &str = "burrito";

pub fn sample_person() -> NewPerson {
    NewPerson::named("Alice")
        .with_age(25)
        .with_foods(["pizza", "pasta"])
}

pub fn sample_people() -> Vec<NewPerson> {
    vec![
        NewPerson::named("John").with_age(30).with_foods(["sushi"]),
        NewPerson::named("Mary").with_age(28).with_foods(["burrito"]),
        NewPerson::named("Tom").with_age(35).with_foods(["steak"]),
    ]
}
