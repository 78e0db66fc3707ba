//! Table-driven route registry.
//!
//! Every route is one entry declaring its path, handler, and access level.
//! Registration walks the table in order, so literal segments such as
//! `/cats/new` must be listed before `/cats/{id}`. Access is enforced by the
//! `CurrentUser` extractor on the handlers; the table records it so the
//! policy can be checked in one place.

use actix_web::web::{self, ServiceConfig};
use actix_web::Route;

use crate::errors::UserError;
use crate::{auth, handlers, toys, uploads};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    User,
}

pub struct RouteEntry {
    pub path: &'static str,
    pub access: Access,
    route: fn() -> Route,
}

fn entry(path: &'static str, access: Access, route: fn() -> Route) -> RouteEntry {
    RouteEntry {
        path,
        access,
        route,
    }
}

pub fn route_table() -> Vec<RouteEntry> {
    vec![
        entry("/", Access::Public, || web::get().to(handlers::home)),
        entry("/about", Access::Public, || web::get().to(handlers::about)),
        entry("/signup", Access::Public, || {
            web::get().to(auth::signup_page)
        }),
        entry("/signup", Access::Public, || web::post().to(auth::signup)),
        entry("/login", Access::Public, || web::get().to(auth::login_page)),
        entry("/login", Access::Public, || web::post().to(auth::login)),
        entry("/logout", Access::User, || web::post().to(auth::logout)),
        entry("/cats", Access::User, || {
            web::get().to(handlers::cats_index)
        }),
        entry("/cats", Access::User, || {
            web::post().to(handlers::create_cat)
        }),
        entry("/cats/new", Access::User, || {
            web::get().to(handlers::new_cat)
        }),
        entry("/cats/{id}", Access::User, || {
            web::get().to(handlers::cat_detail)
        }),
        entry("/cats/{id}", Access::User, || {
            web::post().to(handlers::update_cat)
        }),
        entry("/cats/{id}/edit", Access::User, || {
            web::get().to(handlers::edit_cat)
        }),
        entry("/cats/{id}/delete", Access::User, || {
            web::get().to(handlers::confirm_delete_cat)
        }),
        entry("/cats/{id}/delete", Access::User, || {
            web::post().to(handlers::delete_cat)
        }),
        entry("/cats/{id}/feedings", Access::User, || {
            web::post().to(handlers::add_feeding)
        }),
        entry("/cats/{cat_id}/toys/{toy_id}/associate", Access::User, || {
            web::post().to(handlers::assoc_toy)
        }),
        entry(
            "/cats/{cat_id}/toys/{toy_id}/dissociate",
            Access::User,
            || web::post().to(handlers::unassoc_toy),
        ),
        entry("/cats/{id}/photos", Access::User, || {
            web::post().to(uploads::add_photo)
        }),
        entry("/toys", Access::User, || web::get().to(toys::toy_list)),
        entry("/toys", Access::User, || web::post().to(toys::create_toy)),
        entry("/toys/new", Access::User, || web::get().to(toys::new_toy)),
        entry("/toys/{id}", Access::User, || {
            web::get().to(toys::toy_detail)
        }),
        entry("/toys/{id}", Access::User, || {
            web::post().to(toys::update_toy)
        }),
        entry("/toys/{id}/edit", Access::User, || {
            web::get().to(toys::edit_toy)
        }),
        entry("/toys/{id}/delete", Access::User, || {
            web::get().to(toys::confirm_delete_toy)
        }),
        entry("/toys/{id}/delete", Access::User, || {
            web::post().to(toys::delete_toy)
        }),
    ]
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.app_data(
        web::PathConfig::default().error_handler(|_, _| UserError::ValidationError.into()),
    );
    cfg.app_data(
        web::FormConfig::default().error_handler(|_, _| UserError::ValidationError.into()),
    );

    // Entries sharing a path must land on one resource, otherwise the first
    // resource swallows requests for the other methods.
    let mut grouped: Vec<(&'static str, Vec<fn() -> Route>)> = Vec::new();
    for route_entry in route_table() {
        match grouped.iter_mut().find(|(path, _)| *path == route_entry.path) {
            Some((_, routes)) => routes.push(route_entry.route),
            None => grouped.push((route_entry.path, vec![route_entry.route])),
        }
    }

    for (path, factories) in grouped {
        let mut resource = web::resource(path);
        for factory in factories {
            resource = resource.route(factory());
        }
        cfg.service(resource);
    }
}
