//! Diesel access layer for the relational backing store.
//!
//! Everything here is synchronous and takes a pooled connection; handlers
//! call these through `web::block`.

use diesel::dsl::exists;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::QueryFragment;
use diesel::query_dsl::methods::ExecuteDsl;

use crate::model::{
    Cat, Feeding, NewCat, NewCatToy, NewFeeding, NewPhoto, NewToy, NewUser, Photo, Toy, User,
};
use crate::schema::{cat_toys, cats, feedings, photos, toys, users};

// Users

pub fn create_user(conn: &mut PgConnection, new_user: &NewUser) -> QueryResult<User> {
    diesel::insert_into(users::table)
        .values(new_user)
        .get_result(conn)
}

pub fn user_by_username(conn: &mut PgConnection, username: &str) -> QueryResult<Option<User>> {
    users::table
        .filter(users::username.eq(username))
        .first(conn)
        .optional()
}

// Cats

fn cats_for_user_query(user_id: i32) -> cats::BoxedQuery<'static, Pg> {
    cats::table
        .filter(cats::user_id.eq(user_id))
        .order(cats::name.asc())
        .into_boxed()
}

pub fn cats_for_user(conn: &mut PgConnection, user_id: i32) -> QueryResult<Vec<Cat>> {
    cats_for_user_query(user_id).load(conn)
}

/// Ownership-checked read: a cat belonging to someone else behaves exactly
/// like a cat that does not exist.
pub fn cat_for_user(conn: &mut PgConnection, cat_id: i32, user_id: i32) -> QueryResult<Option<Cat>> {
    cats::table
        .find(cat_id)
        .filter(cats::user_id.eq(user_id))
        .first(conn)
        .optional()
}

pub fn create_cat(conn: &mut PgConnection, new_cat: &NewCat) -> QueryResult<Cat> {
    diesel::insert_into(cats::table)
        .values(new_cat)
        .get_result(conn)
}

/// Only description and age are mutable after creation.
pub fn update_cat(
    conn: &mut PgConnection,
    cat_id: i32,
    user_id: i32,
    description: &str,
    age: i32,
) -> QueryResult<Option<Cat>> {
    diesel::update(
        cats::table
            .find(cat_id)
            .filter(cats::user_id.eq(user_id)),
    )
    .set((cats::description.eq(description), cats::age.eq(age)))
    .get_result(conn)
    .optional()
}

/// Feedings, photos and toy associations go with the cat via `ON DELETE
/// CASCADE`.
pub fn delete_cat(conn: &mut PgConnection, cat_id: i32, user_id: i32) -> QueryResult<bool> {
    let deleted = diesel::delete(
        cats::table
            .find(cat_id)
            .filter(cats::user_id.eq(user_id)),
    )
    .execute(conn)?;
    Ok(deleted > 0)
}

// Feedings

pub fn feedings_for_cat(conn: &mut PgConnection, cat_id: i32) -> QueryResult<Vec<Feeding>> {
    feedings::table
        .filter(feedings::cat_id.eq(cat_id))
        .order(feedings::date.desc())
        .load(conn)
}

pub fn create_feeding(conn: &mut PgConnection, new_feeding: &NewFeeding) -> QueryResult<Feeding> {
    diesel::insert_into(feedings::table)
        .values(new_feeding)
        .get_result(conn)
}

// Toys (global, not user-scoped)

pub fn all_toys(conn: &mut PgConnection) -> QueryResult<Vec<Toy>> {
    toys::table.order(toys::name.asc()).load(conn)
}

pub fn get_toy(conn: &mut PgConnection, toy_id: i32) -> QueryResult<Option<Toy>> {
    toys::table.find(toy_id).first(conn).optional()
}

pub fn create_toy(conn: &mut PgConnection, new_toy: &NewToy) -> QueryResult<Toy> {
    diesel::insert_into(toys::table)
        .values(new_toy)
        .get_result(conn)
}

pub fn update_toy(
    conn: &mut PgConnection,
    toy_id: i32,
    name: &str,
    color: &str,
) -> QueryResult<Option<Toy>> {
    diesel::update(toys::table.find(toy_id))
        .set((toys::name.eq(name), toys::color.eq(color)))
        .get_result(conn)
        .optional()
}

pub fn delete_toy(conn: &mut PgConnection, toy_id: i32) -> QueryResult<bool> {
    let deleted = diesel::delete(toys::table.find(toy_id)).execute(conn)?;
    Ok(deleted > 0)
}

pub fn toys_for_cat(conn: &mut PgConnection, cat_id: i32) -> QueryResult<Vec<Toy>> {
    toys::table
        .inner_join(cat_toys::table)
        .filter(cat_toys::cat_id.eq(cat_id))
        .select(toys::all_columns)
        .order(toys::name.asc())
        .load(conn)
}

fn toys_excluding_query(cat_id: i32) -> toys::BoxedQuery<'static, Pg> {
    let owned = cat_toys::table
        .filter(cat_toys::cat_id.eq(cat_id))
        .select(cat_toys::toy_id);
    toys::table
        .filter(toys::id.ne_all(owned))
        .order(toys::name.asc())
        .into_boxed()
}

/// Toys the cat does not have yet, for the "add a toy" affordance on the
/// detail page.
pub fn toys_excluding(conn: &mut PgConnection, cat_id: i32) -> QueryResult<Vec<Toy>> {
    toys_excluding_query(cat_id).load(conn)
}

// Association manager

fn associate_statement(
    cat_id: i32,
    toy_id: i32,
) -> impl ExecuteDsl<PgConnection> + QueryFragment<Pg> {
    diesel::insert_into(cat_toys::table)
        .values(NewCatToy { cat_id, toy_id })
        .on_conflict((cat_toys::cat_id, cat_toys::toy_id))
        .do_nothing()
}

fn dissociate_statement(
    cat_id: i32,
    toy_id: i32,
) -> impl ExecuteDsl<PgConnection> + QueryFragment<Pg> {
    diesel::delete(
        cat_toys::table
            .filter(cat_toys::cat_id.eq(cat_id))
            .filter(cat_toys::toy_id.eq(toy_id)),
    )
}

/// Idempotent: associating an already-linked toy is a no-op, as is an
/// unknown toy id. Returns whether a link exists afterwards.
pub fn associate_toy(conn: &mut PgConnection, cat_id: i32, toy_id: i32) -> QueryResult<bool> {
    let toy_exists: bool = diesel::select(exists(toys::table.find(toy_id))).get_result(conn)?;
    if !toy_exists {
        return Ok(false);
    }
    ExecuteDsl::execute(associate_statement(cat_id, toy_id), conn)?;
    Ok(true)
}

/// Idempotent: removing a link that does not exist is a no-op success.
pub fn dissociate_toy(conn: &mut PgConnection, cat_id: i32, toy_id: i32) -> QueryResult<bool> {
    let deleted = ExecuteDsl::execute(dissociate_statement(cat_id, toy_id), conn)?;
    Ok(deleted > 0)
}

// Photos

pub fn photos_for_cat(conn: &mut PgConnection, cat_id: i32) -> QueryResult<Vec<Photo>> {
    photos::table
        .filter(photos::cat_id.eq(cat_id))
        .order(photos::id.asc())
        .load(conn)
}

pub fn create_photo(conn: &mut PgConnection, new_photo: &NewPhoto) -> QueryResult<Photo> {
    diesel::insert_into(photos::table)
        .values(new_photo)
        .get_result(conn)
}
