use chrono::NaiveDate;
use diesel::{prelude::Insertable, Queryable};
use serde::Serialize;

use crate::schema::{cat_toys, cats, feedings, photos, toys, users};

#[derive(Queryable, Serialize, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
}

#[derive(Queryable, Serialize, Clone)]
pub struct Cat {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub breed: String,
    pub description: String,
    pub age: i32,
}

#[derive(Insertable)]
#[diesel(table_name = cats)]
pub struct NewCat {
    pub user_id: i32,
    pub name: String,
    pub breed: String,
    pub description: String,
    pub age: i32,
}

#[derive(Queryable, Serialize, Clone)]
pub struct Feeding {
    pub id: i32,
    pub cat_id: i32,
    pub date: NaiveDate,
    pub meal: String,
}

#[derive(Insertable)]
#[diesel(table_name = feedings)]
pub struct NewFeeding {
    pub cat_id: i32,
    pub date: NaiveDate,
    pub meal: String,
}

#[derive(Queryable, Serialize, Clone)]
pub struct Toy {
    pub id: i32,
    pub name: String,
    pub color: String,
}

#[derive(Insertable)]
#[diesel(table_name = toys)]
pub struct NewToy {
    pub name: String,
    pub color: String,
}

#[derive(Insertable)]
#[diesel(table_name = cat_toys)]
pub struct NewCatToy {
    pub cat_id: i32,
    pub toy_id: i32,
}

#[derive(Queryable, Serialize, Clone)]
pub struct Photo {
    pub id: i32,
    pub cat_id: i32,
    pub url: String,
}

#[derive(Insertable)]
#[diesel(table_name = photos)]
pub struct NewPhoto {
    pub cat_id: i32,
    pub url: String,
}

/// Meals are stored as one-letter codes in the `feedings.meal` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

impl Meal {
    pub const ALL: [Meal; 3] = [Meal::Breakfast, Meal::Lunch, Meal::Dinner];

    pub fn from_code(code: &str) -> Option<Meal> {
        match code {
            "B" => Some(Meal::Breakfast),
            "L" => Some(Meal::Lunch),
            "D" => Some(Meal::Dinner),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Meal::Breakfast => "B",
            Meal::Lunch => "L",
            Meal::Dinner => "D",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Meal::Breakfast => "Breakfast",
            Meal::Lunch => "Lunch",
            Meal::Dinner => "Dinner",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_codes_round_trip() {
        for meal in Meal::ALL {
            assert_eq!(Meal::from_code(meal.code()), Some(meal));
        }
    }

    #[test]
    fn unknown_meal_code_is_rejected() {
        assert_eq!(Meal::from_code("X"), None);
        assert_eq!(Meal::from_code(""), None);
        assert_eq!(Meal::from_code("Breakfast"), None);
    }

    #[test]
    fn meal_labels() {
        assert_eq!(Meal::Breakfast.label(), "Breakfast");
        assert_eq!(Meal::Lunch.label(), "Lunch");
        assert_eq!(Meal::Dinner.label(), "Dinner");
    }
}
