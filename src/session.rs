//! Session plumbing: a small wrapper over the cookie session so handlers
//! only deal with a typed `CurrentUser`.

use actix_session::{Session, SessionExt};
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::errors::UserError;
use crate::model::User;

const USER_ID_KEY: &str = "user_id";
const USERNAME_KEY: &str = "username";

/// Authenticated user extracted from the session cookie.
///
/// Using this as a handler argument is what marks a route as
/// session-required: extraction fails with `AuthRequired`, which renders as
/// a redirect to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
}

/// Establish a logged-in session for `user`.
pub fn establish(session: &Session, user: &User) -> Result<(), UserError> {
    session.renew();
    session
        .insert(USER_ID_KEY, user.id)
        .map_err(|_| UserError::UnexpectedError)?;
    session
        .insert(USERNAME_KEY, &user.username)
        .map_err(|_| UserError::UnexpectedError)
}

pub fn clear(session: &Session) {
    session.purge();
}

impl FromRequest for CurrentUser {
    type Error = UserError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = req.get_session();
        let user = match (
            session.get::<i32>(USER_ID_KEY),
            session.get::<String>(USERNAME_KEY),
        ) {
            (Ok(Some(id)), Ok(Some(username))) => Ok(CurrentUser { id, username }),
            _ => Err(UserError::AuthRequired),
        };
        ready(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_session::storage::CookieSessionStore;
    use actix_session::SessionMiddleware;
    use actix_web::cookie::Key;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, web, App, HttpResponse};

    fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
        SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
            .cookie_name("session".to_owned())
            .cookie_secure(false)
            .build()
    }

    async fn login_fixture(session: Session) -> Result<HttpResponse, UserError> {
        let user = User {
            id: 42,
            username: "alice".to_owned(),
            password_hash: String::new(),
            password_salt: String::new(),
        };
        establish(&session, &user)?;
        Ok(HttpResponse::Ok().finish())
    }

    async fn whoami(user: CurrentUser) -> Result<HttpResponse, UserError> {
        Ok(HttpResponse::Ok().body(format!("{}:{}", user.id, user.username)))
    }

    #[actix_web::test]
    async fn current_user_round_trips_through_the_cookie() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route("/login-fixture", web::get().to(login_fixture))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let login = test::call_service(
            &app,
            test::TestRequest::get().uri("/login-fixture").to_request(),
        )
        .await;
        assert_eq!(login.status(), StatusCode::OK);
        let cookie = login
            .response()
            .cookies()
            .find(|c| c.name() == "session")
            .expect("session cookie set");

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/whoami")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = test::read_body(res).await;
        assert_eq!(body, "42:alice");
    }

    #[actix_web::test]
    async fn missing_session_redirects_to_login() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let res =
            test::call_service(&app, test::TestRequest::get().uri("/whoami").to_request()).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            res.headers().get(header::LOCATION).expect("Location"),
            "/login"
        );
    }
}
