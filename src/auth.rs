//! Signup, login and logout, backed by salted password digests.

use actix_session::Session;
use actix_web::{web, HttpResponse};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use handlebars::Handlebars;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::errors::UserError;
use crate::handlers::{blocking, get_conn, render, see_other, validation_messages};
use crate::model::NewUser;
use crate::session::CurrentUser;
use crate::{session, store, DbPool};

#[derive(Deserialize, Validate)]
pub struct SignupForm {
    #[validate(length(min = 3, max = 30, message = "Username must be 3-30 characters"))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password_confirm: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub(crate) fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

pub(crate) fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub async fn signup_page(hb: web::Data<Handlebars<'_>>) -> Result<HttpResponse, UserError> {
    render(&hb, "signup", &json!({}))
}

pub async fn signup(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    session: Session,
    form: web::Form<SignupForm>,
) -> Result<HttpResponse, UserError> {
    if let Err(errors) = form.validate() {
        return render(
            &hb,
            "signup",
            &json!({
                "errors": validation_messages(&errors),
                "username": form.username,
            }),
        );
    }

    let salt = generate_salt();
    let new_user = NewUser {
        username: form.username.trim().to_owned(),
        password_hash: hash_password(&form.password, &salt),
        password_salt: salt,
    };

    let mut conn = get_conn(&pool)?;
    let created = web::block(move || store::create_user(&mut conn, &new_user))
        .await
        .map_err(|_| {
            error!("Blocking thread pool error");
            UserError::UnexpectedError
        })?;

    match created {
        Ok(user) => {
            session::establish(&session, &user)?;
            Ok(see_other("/cats"))
        }
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => render(
            &hb,
            "signup",
            &json!({
                "errors": ["That username is taken"],
                "username": form.username,
            }),
        ),
        Err(e) => {
            error!("Failed to create user: {}", e);
            Err(UserError::UnexpectedError)
        }
    }
}

pub async fn login_page(hb: web::Data<Handlebars<'_>>) -> Result<HttpResponse, UserError> {
    render(&hb, "login", &json!({}))
}

pub async fn login(
    hb: web::Data<Handlebars<'_>>,
    pool: web::Data<DbPool>,
    session: Session,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, UserError> {
    let mut conn = get_conn(&pool)?;
    let username = form.username.trim().to_owned();
    let user = blocking(move || store::user_by_username(&mut conn, &username)).await?;

    let authenticated =
        user.filter(|u| hash_password(&form.password, &u.password_salt) == u.password_hash);

    match authenticated {
        Some(user) => {
            session::establish(&session, &user)?;
            Ok(see_other("/cats"))
        }
        None => render(
            &hb,
            "login",
            &json!({
                "errors": ["Invalid username or password"],
                "username": form.username,
            }),
        ),
    }
}

pub async fn logout(session: Session, _user: CurrentUser) -> Result<HttpResponse, UserError> {
    session::clear(&session);
    Ok(see_other("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_deterministic_per_salt() {
        let salt = "aabbccdd";
        assert_eq!(
            hash_password("hunter22", salt),
            hash_password("hunter22", salt)
        );
        assert_ne!(
            hash_password("hunter22", salt),
            hash_password("hunter22", "eeff0011"),
        );
        assert_ne!(
            hash_password("hunter22", salt),
            hash_password("hunter23", salt)
        );
    }

    #[test]
    fn salts_are_random_hex() {
        let a = generate_salt();
        let b = generate_salt();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signup_form_requires_matching_passwords() {
        let form = SignupForm {
            username: "alice".to_owned(),
            password: "correcthorse".to_owned(),
            password_confirm: "correcthors".to_owned(),
        };
        let errors = form.validate().expect_err("mismatch must fail");
        let messages = validation_messages(&errors);
        assert!(messages.iter().any(|m| m.contains("do not match")));
    }

    #[test]
    fn signup_form_rejects_short_passwords() {
        let form = SignupForm {
            username: "alice".to_owned(),
            password: "short".to_owned(),
            password_confirm: "short".to_owned(),
        };
        assert!(form.validate().is_err());
    }
}
