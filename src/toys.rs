//! Toy CRUD. Toys are shared across all users rather than owned, so these
//! handlers require a session but do not scope queries to it.

use actix_web::{web, HttpResponse};
use handlebars::Handlebars;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::errors::UserError;
use crate::handlers::{blocking, get_conn, render, see_other, validation_messages};
use crate::model::NewToy;
use crate::session::CurrentUser;
use crate::{store, DbPool};

#[derive(Deserialize, Validate)]
pub struct ToyPath {
    #[validate(range(min = 1))]
    pub id: i32,
}

#[derive(Deserialize, Validate)]
pub struct ToyForm {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "Color must be 1-50 characters"))]
    pub color: String,
}

pub async fn toy_list(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
) -> Result<HttpResponse, UserError> {
    let mut conn = get_conn(&pool)?;
    let toys = blocking(move || store::all_toys(&mut conn)).await?;
    render(
        &hb,
        "toys/index",
        &json!({ "username": user.username, "toys": toys }),
    )
}

pub async fn toy_detail(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
    path: web::Path<ToyPath>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let mut conn = get_conn(&pool)?;
    let toy_id = path.id;
    let toy = blocking(move || store::get_toy(&mut conn, toy_id))
        .await?
        .ok_or(UserError::NotFoundError)?;
    render(
        &hb,
        "toys/detail",
        &json!({ "username": user.username, "toy": toy }),
    )
}

pub async fn new_toy(
    hb: web::Data<Handlebars<'_>>,
    user: CurrentUser,
) -> Result<HttpResponse, UserError> {
    render(
        &hb,
        "toys/form",
        &json!({ "username": user.username, "is_new": true }),
    )
}

pub async fn create_toy(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
    form: web::Form<ToyForm>,
) -> Result<HttpResponse, UserError> {
    if let Err(errors) = form.validate() {
        return render(
            &hb,
            "toys/form",
            &json!({
                "username": user.username,
                "is_new": true,
                "errors": validation_messages(&errors),
                "toy": { "name": form.name, "color": form.color },
            }),
        );
    }

    let mut conn = get_conn(&pool)?;
    let new_toy = NewToy {
        name: form.name.clone(),
        color: form.color.clone(),
    };
    let toy = blocking(move || store::create_toy(&mut conn, &new_toy)).await?;
    Ok(see_other(&format!("/toys/{}", toy.id)))
}

pub async fn edit_toy(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
    path: web::Path<ToyPath>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let mut conn = get_conn(&pool)?;
    let toy_id = path.id;
    let toy = blocking(move || store::get_toy(&mut conn, toy_id))
        .await?
        .ok_or(UserError::NotFoundError)?;
    render(
        &hb,
        "toys/form",
        &json!({ "username": user.username, "is_edit": true, "toy": toy }),
    )
}

pub async fn update_toy(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
    path: web::Path<ToyPath>,
    form: web::Form<ToyForm>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let toy_id = path.id;

    if let Err(errors) = form.validate() {
        return render(
            &hb,
            "toys/form",
            &json!({
                "username": user.username,
                "is_edit": true,
                "errors": validation_messages(&errors),
                "toy": { "id": toy_id, "name": form.name, "color": form.color },
            }),
        );
    }

    let mut conn = get_conn(&pool)?;
    let name = form.name.clone();
    let color = form.color.clone();
    let updated = blocking(move || store::update_toy(&mut conn, toy_id, &name, &color)).await?;
    match updated {
        Some(toy) => Ok(see_other(&format!("/toys/{}", toy.id))),
        None => Err(UserError::NotFoundError),
    }
}

pub async fn confirm_delete_toy(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    user: CurrentUser,
    path: web::Path<ToyPath>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let mut conn = get_conn(&pool)?;
    let toy_id = path.id;
    let toy = blocking(move || store::get_toy(&mut conn, toy_id))
        .await?
        .ok_or(UserError::NotFoundError)?;
    render(
        &hb,
        "toys/confirm_delete",
        &json!({ "username": user.username, "toy": toy }),
    )
}

pub async fn delete_toy(
    pool: web::Data<DbPool>,
    _user: CurrentUser,
    path: web::Path<ToyPath>,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let mut conn = get_conn(&pool)?;
    let toy_id = path.id;
    let deleted = blocking(move || store::delete_toy(&mut conn, toy_id)).await?;
    if !deleted {
        return Err(UserError::NotFoundError);
    }
    Ok(see_other("/toys"))
}
