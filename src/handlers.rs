use actix_web::http::header;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use handlebars::Handlebars;
use serde::Deserialize;
use serde_json::json;
use validator::{Validate, ValidationErrors};

use crate::errors::UserError;
use crate::model::{Cat, Meal, NewCat, NewFeeding};
use crate::session::CurrentUser;
use crate::{store, DbConn, DbPool};

#[derive(Deserialize, Validate)]
pub struct CatPath {
    #[validate(range(min = 1))]
    pub id: i32,
}

#[derive(Deserialize, Validate)]
pub struct AssocPath {
    #[validate(range(min = 1))]
    pub cat_id: i32,
    #[validate(range(min = 1))]
    pub toy_id: i32,
}

#[derive(Deserialize, Validate)]
pub struct CatForm {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Breed must be 1-100 characters"))]
    pub breed: String,
    #[validate(length(max = 1000, message = "Description is too long"))]
    pub description: String,
    #[validate(range(min = 0, max = 40, message = "Age must be between 0 and 40"))]
    pub age: i32,
}

#[derive(Deserialize, Validate)]
pub struct CatUpdateForm {
    #[validate(length(max = 1000, message = "Description is too long"))]
    pub description: String,
    #[validate(range(min = 0, max = 40, message = "Age must be between 0 and 40"))]
    pub age: i32,
}

#[derive(Deserialize)]
pub struct FeedingForm {
    pub date: String,
    pub meal: String,
}

impl FeedingForm {
    fn parse(&self) -> Result<(NaiveDate, Meal), &'static str> {
        let meal = Meal::from_code(self.meal.as_str()).ok_or("Pick a meal from the list")?;
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| "Enter the feeding date as YYYY-MM-DD")?;
        Ok((date, meal))
    }
}

// Shared helpers

pub(crate) fn get_conn(pool: &web::Data<DbPool>) -> Result<DbConn, UserError> {
    pool.get().map_err(|_| {
        error!("Failed to get DB connection from pool");
        UserError::DBPoolGetError
    })
}

pub(crate) async fn blocking<T, F>(f: F) -> Result<T, UserError>
where
    F: FnOnce() -> diesel::QueryResult<T> + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|_| {
            error!("Blocking thread pool error");
            UserError::UnexpectedError
        })?
        .map_err(|e| match e {
            diesel::result::Error::NotFound => UserError::NotFoundError,
            _ => {
                error!("Database error: {}", e);
                UserError::UnexpectedError
            }
        })
}

pub(crate) fn render(
    hb: &Handlebars<'_>,
    name: &str,
    data: &serde_json::Value,
) -> Result<HttpResponse, UserError> {
    let body = hb.render(name, data).map_err(|e| {
        error!("Failed to render template {}: {}", name, e);
        UserError::UnexpectedError
    })?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

pub(crate) fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub(crate) fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();
    messages.sort();
    messages
}

// Public pages

pub async fn home(hb: web::Data<Handlebars<'_>>) -> Result<HttpResponse, UserError> {
    render(&hb, "home", &json!({}))
}

pub async fn about(hb: web::Data<Handlebars<'_>>) -> Result<HttpResponse, UserError> {
    render(&hb, "about", &json!({}))
}

// Cats

pub async fn cats_index(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
) -> Result<HttpResponse, UserError> {
    let mut conn = get_conn(&pool)?;
    let user_id = user.id;
    let cats = blocking(move || store::cats_for_user(&mut conn, user_id)).await?;
    render(
        &hb,
        "cats/index",
        &json!({ "username": user.username, "cats": cats }),
    )
}

pub async fn new_cat(
    hb: web::Data<Handlebars<'_>>,
    user: CurrentUser,
) -> Result<HttpResponse, UserError> {
    render(
        &hb,
        "cats/form",
        &json!({ "username": user.username, "is_new": true }),
    )
}

pub async fn create_cat(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
    form: web::Form<CatForm>,
) -> Result<HttpResponse, UserError> {
    if let Err(errors) = form.validate() {
        return render(
            &hb,
            "cats/form",
            &json!({
                "username": user.username,
                "is_new": true,
                "errors": validation_messages(&errors),
                "cat": {
                    "name": form.name,
                    "breed": form.breed,
                    "description": form.description,
                    "age": form.age,
                },
            }),
        );
    }

    let mut conn = get_conn(&pool)?;
    // The owner always comes from the session, never from the form.
    let new_cat = NewCat {
        user_id: user.id,
        name: form.name.clone(),
        breed: form.breed.clone(),
        description: form.description.clone(),
        age: form.age,
    };
    let cat = blocking(move || store::create_cat(&mut conn, &new_cat)).await?;
    Ok(see_other(&format!("/cats/{}", cat.id)))
}

async fn render_detail(
    hb: &Handlebars<'_>,
    pool: &web::Data<DbPool>,
    user: &CurrentUser,
    cat_id: i32,
    feeding_error: Option<&'static str>,
) -> Result<HttpResponse, UserError> {
    let mut conn = get_conn(pool)?;
    let user_id = user.id;
    let detail = blocking(move || {
        let cat = match store::cat_for_user(&mut conn, cat_id, user_id)? {
            Some(cat) => cat,
            None => return Ok(None),
        };
        let feedings = store::feedings_for_cat(&mut conn, cat_id)?;
        let photos = store::photos_for_cat(&mut conn, cat_id)?;
        let toys = store::toys_for_cat(&mut conn, cat_id)?;
        let available_toys = store::toys_excluding(&mut conn, cat_id)?;
        Ok(Some((cat, feedings, photos, toys, available_toys)))
    })
    .await?;

    let (cat, feedings, photos, toys, available_toys) =
        detail.ok_or(UserError::NotFoundError)?;

    let feedings: Vec<serde_json::Value> = feedings
        .iter()
        .map(|f| {
            let meal = Meal::from_code(&f.meal).map_or(f.meal.as_str(), |m| m.label());
            json!({ "date": f.date.format("%b %-d, %Y").to_string(), "meal": meal })
        })
        .collect();
    let meals: Vec<serde_json::Value> = Meal::ALL
        .iter()
        .map(|m| json!({ "code": m.code(), "label": m.label() }))
        .collect();

    render(
        hb,
        "cats/detail",
        &json!({
            "username": user.username,
            "cat": cat,
            "feedings": feedings,
            "photos": photos,
            "toys": toys,
            "available_toys": available_toys,
            "meals": meals,
            "feeding_error": feeding_error,
        }),
    )
}

pub async fn cat_detail(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
    path: web::Path<CatPath>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    render_detail(&hb, &pool, &user, path.id, None).await
}

/// Template data for the edit form. `description` and `age` come from
/// whatever the user last submitted; the immutable fields always come from
/// the stored cat.
fn cat_edit_context(
    username: &str,
    cat: &Cat,
    description: &str,
    age: i32,
    errors: Vec<String>,
) -> serde_json::Value {
    json!({
        "username": username,
        "is_edit": true,
        "errors": errors,
        "cat": {
            "id": cat.id,
            "name": cat.name,
            "breed": cat.breed,
            "description": description,
            "age": age,
        },
    })
}

pub async fn edit_cat(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
    path: web::Path<CatPath>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let mut conn = get_conn(&pool)?;
    let (cat_id, user_id) = (path.id, user.id);
    let cat = blocking(move || store::cat_for_user(&mut conn, cat_id, user_id))
        .await?
        .ok_or(UserError::NotFoundError)?;
    let context = cat_edit_context(&user.username, &cat, &cat.description, cat.age, Vec::new());
    render(&hb, "cats/form", &context)
}

pub async fn update_cat(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
    path: web::Path<CatPath>,
    form: web::Form<CatUpdateForm>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let cat_id = path.id;

    if let Err(errors) = form.validate() {
        let mut conn = get_conn(&pool)?;
        let user_id = user.id;
        let cat = blocking(move || store::cat_for_user(&mut conn, cat_id, user_id))
            .await?
            .ok_or(UserError::NotFoundError)?;
        let context = cat_edit_context(
            &user.username,
            &cat,
            &form.description,
            form.age,
            validation_messages(&errors),
        );
        return render(&hb, "cats/form", &context);
    }

    let mut conn = get_conn(&pool)?;
    let user_id = user.id;
    let description = form.description.clone();
    let age = form.age;
    let updated =
        blocking(move || store::update_cat(&mut conn, cat_id, user_id, &description, age)).await?;
    match updated {
        Some(cat) => Ok(see_other(&format!("/cats/{}", cat.id))),
        None => Err(UserError::NotFoundError),
    }
}

pub async fn confirm_delete_cat(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
    path: web::Path<CatPath>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let mut conn = get_conn(&pool)?;
    let (cat_id, user_id) = (path.id, user.id);
    let cat = blocking(move || store::cat_for_user(&mut conn, cat_id, user_id))
        .await?
        .ok_or(UserError::NotFoundError)?;
    render(
        &hb,
        "cats/confirm_delete",
        &json!({ "username": user.username, "cat": cat }),
    )
}

pub async fn delete_cat(
    pool: web::Data<DbPool>,
    user: CurrentUser,
    path: web::Path<CatPath>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let mut conn = get_conn(&pool)?;
    let (cat_id, user_id) = (path.id, user.id);
    let deleted = blocking(move || store::delete_cat(&mut conn, cat_id, user_id)).await?;
    if !deleted {
        return Err(UserError::NotFoundError);
    }
    Ok(see_other("/cats"))
}

// Feedings

pub async fn add_feeding(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
    path: web::Path<CatPath>,
    form: web::Form<FeedingForm>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let cat_id = path.id;

    let (date, meal) = match form.parse() {
        Ok(parsed) => parsed,
        // A rejected submission re-renders the detail page with the reason
        // instead of being silently dropped.
        Err(reason) => return render_detail(&hb, &pool, &user, cat_id, Some(reason)).await,
    };

    let mut conn = get_conn(&pool)?;
    let user_id = user.id;
    let created = blocking(move || {
        if store::cat_for_user(&mut conn, cat_id, user_id)?.is_none() {
            return Ok(None);
        }
        let new_feeding = NewFeeding {
            cat_id,
            date,
            meal: meal.code().to_owned(),
        };
        store::create_feeding(&mut conn, &new_feeding).map(Some)
    })
    .await?;

    if created.is_none() {
        return Err(UserError::NotFoundError);
    }
    Ok(see_other(&format!("/cats/{}", cat_id)))
}

// Toy associations

pub async fn assoc_toy(
    pool: web::Data<DbPool>,
    user: CurrentUser,
    path: web::Path<AssocPath>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let mut conn = get_conn(&pool)?;
    let (cat_id, toy_id, user_id) = (path.cat_id, path.toy_id, user.id);
    let found = blocking(move || {
        if store::cat_for_user(&mut conn, cat_id, user_id)?.is_none() {
            return Ok(false);
        }
        store::associate_toy(&mut conn, cat_id, toy_id)?;
        Ok(true)
    })
    .await?;
    if !found {
        return Err(UserError::NotFoundError);
    }
    Ok(see_other(&format!("/cats/{}", cat_id)))
}

pub async fn unassoc_toy(
    pool: web::Data<DbPool>,
    user: CurrentUser,
    path: web::Path<AssocPath>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let mut conn = get_conn(&pool)?;
    let (cat_id, toy_id, user_id) = (path.cat_id, path.toy_id, user.id);
    let found = blocking(move || {
        if store::cat_for_user(&mut conn, cat_id, user_id)?.is_none() {
            return Ok(false);
        }
        store::dissociate_toy(&mut conn, cat_id, toy_id)?;
        Ok(true)
    })
    .await?;
    if !found {
        return Err(UserError::NotFoundError);
    }
    Ok(see_other(&format!("/cats/{}", cat_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feeding_form_accepts_valid_input() {
        let form = FeedingForm {
            date: "2024-05-01".to_owned(),
            meal: "B".to_owned(),
        };
        let (date, meal) = form.parse().expect("valid form");
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"));
        assert_eq!(meal, Meal::Breakfast);
    }

    #[test]
    fn feeding_form_rejects_unknown_meals() {
        let form = FeedingForm {
            date: "2024-05-01".to_owned(),
            meal: "X".to_owned(),
        };
        assert!(form.parse().is_err());
    }

    #[test]
    fn feeding_form_rejects_unparseable_dates() {
        let form = FeedingForm {
            date: "05/01/2024".to_owned(),
            meal: "L".to_owned(),
        };
        assert!(form.parse().is_err());
    }

    #[test]
    fn rejected_edit_keeps_the_stored_name_and_the_submitted_fields() {
        let cat = Cat {
            id: 5,
            user_id: 1,
            name: "Tom".to_owned(),
            breed: "Tabby".to_owned(),
            description: "grumpy".to_owned(),
            age: 3,
        };
        let context = cat_edit_context(
            "alice",
            &cat,
            "even grumpier",
            99,
            vec!["Age must be between 0 and 40".to_owned()],
        );
        assert_eq!(context["cat"]["name"], "Tom");
        assert_eq!(context["cat"]["breed"], "Tabby");
        assert_eq!(context["cat"]["description"], "even grumpier");
        assert_eq!(context["cat"]["age"], 99);
        assert_eq!(context["errors"][0], "Age must be between 0 and 40");
    }

    #[test]
    fn cat_form_validation_surfaces_field_messages() {
        let form = CatForm {
            name: String::new(),
            breed: "Tabby".to_owned(),
            description: String::new(),
            age: 99,
        };
        let errors = form.validate().expect_err("invalid form");
        let messages = validation_messages(&errors);
        assert!(messages.iter().any(|m| m.contains("Age")));
        assert!(messages.iter().any(|m| m.contains("Name")));
    }
}
