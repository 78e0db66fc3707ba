#[macro_use]
extern crate log;

use actix_files::Files;
use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use aws_config::BehaviorVersion;
use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use handlebars::Handlebars;

mod auth;
mod config;
mod errors;
mod handlers;
mod model;
mod routes;
mod schema;
mod session;
mod store;
mod toys;
mod uploads;

use self::config::Config;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConn = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

fn setup_database(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);

    r2d2::Pool::builder()
        .build(manager)
        .expect("Failed to create DB connection pool.")
}

fn setup_templates() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars
        .register_templates_directory(".html", "./templates")
        .expect("Failed to register the templates directory");
    handlebars
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize env logger
    env_logger::init();

    let config = Config::from_env();

    let pool = setup_database(&config.database_url);
    let handlebars = web::Data::new(setup_templates());

    // One S3 client for the whole process, shared through web::Data.
    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_client = web::Data::new(aws_sdk_s3::Client::new(&aws_config));
    let upload_config = web::Data::new(config.upload.clone());

    std::fs::create_dir_all("./tmp")?;

    let session_key = config.session_key.clone();

    info!("listening on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            // Single-cookie sessions; served over plain HTTP behind the
            // proxy, so the cookie is not marked secure.
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_secure(false)
                    .build(),
            )
            .app_data(handlebars.clone())
            .app_data(web::Data::new(pool.clone()))
            .app_data(s3_client.clone())
            .app_data(upload_config.clone())
            .app_data(awmp::PartsConfig::default().with_temp_dir("./tmp"))
            .configure(routes::configure)
            .service(Files::new("/static", "static"))
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::cookie::Key;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};

    // build_unchecked never opens a connection, so routes that finish
    // before touching the store can be exercised without a database.
    fn test_pool() -> DbPool {
        let manager = ConnectionManager::<PgConnection>::new("postgres://localhost/unused");
        r2d2::Pool::builder()
            .min_idle(Some(0))
            .build_unchecked(manager)
    }

    fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
        SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
            .cookie_secure(false)
            .build()
    }

    #[actix_web::test]
    async fn public_pages_render() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .app_data(web::Data::new(setup_templates()))
                .app_data(web::Data::new(test_pool()))
                .configure(routes::configure),
        )
        .await;

        for path in ["/", "/about", "/signup", "/login"] {
            let req = test::TestRequest::get().uri(path).to_request();
            let response = test::call_service(&app, req).await;
            assert!(response.status().is_success(), "{path} should render");
        }
    }

    #[actix_web::test]
    async fn protected_routes_redirect_anonymous_users_to_login() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .app_data(web::Data::new(setup_templates()))
                .app_data(web::Data::new(test_pool()))
                .configure(routes::configure),
        )
        .await;

        for path in ["/cats", "/cats/new", "/cats/1", "/toys", "/toys/3"] {
            let req = test::TestRequest::get().uri(path).to_request();
            let response = test::call_service(&app, req).await;
            assert_eq!(
                response.status(),
                StatusCode::SEE_OTHER,
                "{path} should redirect"
            );
            assert_eq!(
                response
                    .headers()
                    .get(header::LOCATION)
                    .expect("Location header"),
                "/login"
            );
        }
    }

    #[actix_web::test]
    async fn logout_requires_a_session() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .app_data(web::Data::new(setup_templates()))
                .app_data(web::Data::new(test_pool()))
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/logout").to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .expect("Location header"),
            "/login"
        );
    }
}
